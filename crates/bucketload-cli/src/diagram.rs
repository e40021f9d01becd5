//! Fixed CI/CD topology and its Graphviz rendering.
//!
//! The graph is declared once in [`cicd_lambda`]; [`Graph::to_dot`] turns it
//! into DOT text and [`Graph::render`] hands that to the Graphviz `dot`
//! binary when an image is wanted.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Image formats `dot` is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    Png,
    Svg,
}

impl RenderFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// Service category, drawn as a distinct node shape and colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Vcs,
    Pipeline,
    Storage,
    Build,
    Config,
    Security,
    Stack,
    Compute,
    Api,
    Monitoring,
    Events,
    Notify,
}

impl NodeKind {
    fn style(self) -> (&'static str, &'static str) {
        match self {
            Self::Vcs => ("box", "#24292e"),
            Self::Pipeline | Self::Build => ("box", "#3f8624"),
            Self::Storage => ("cylinder", "#7aa116"),
            Self::Config | Self::Stack | Self::Monitoring => ("box", "#e7157b"),
            Self::Security => ("octagon", "#dd344c"),
            Self::Compute => ("component", "#ed7100"),
            Self::Api | Self::Events | Self::Notify => ("box", "#e7157b"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: &'static str,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub label: Option<String>,
    pub dashed: bool,
}

/// Nested group of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cluster {
    pub label: &'static str,
    pub nodes: Vec<Node>,
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub title: &'static str,
    pub clusters: Vec<Cluster>,
    pub edges: Vec<Edge>,
}

const STEP_LABELS: [&str; 8] = [
    "1  Push/Merge",
    "2  Source → artifact",
    "3  Build&Test pulls artifact",
    "4  Package → artifact(s)",
    "5  Deploy (env)",
    "6  Smoke test",
    "7  Approval → Deploy prod",
    "8  Alerts on failure",
];

fn step(n: usize) -> Option<String> {
    STEP_LABELS.get(n - 1).map(|s| (*s).to_string())
}

fn node(id: &'static str, label: impl Into<String>, kind: NodeKind) -> Node {
    Node {
        id,
        label: label.into(),
        kind,
    }
}

fn edge(from: &'static str, to: &'static str, label: Option<String>) -> Edge {
    Edge {
        from,
        to,
        label,
        dashed: false,
    }
}

fn dashed(from: &'static str, to: &'static str, label: Option<String>) -> Edge {
    Edge {
        dashed: true,
        ..edge(from, to, label)
    }
}

/// (env, deploy, stack, lambda, api) node ids per environment.
const ENVIRONMENTS: [(&str, &str, &str, &str, &str); 3] = [
    ("dev", "cb_deploy_dev", "cfn_dev", "lam_dev", "api_dev"),
    ("stage", "cb_deploy_stage", "cfn_stage", "lam_stage", "api_stage"),
    ("prod", "cb_deploy_prod", "cfn_prod", "lam_prod", "api_prod"),
];

/// The "CI/CD (AWS) - Lambda path" topology.
pub fn cicd_lambda() -> Graph {
    let environments = ENVIRONMENTS
        .iter()
        .map(|&(env, deploy, stack, lambda, api)| Cluster {
            label: env,
            nodes: vec![
                node(deploy, format!("CodeBuild: Deploy ({env})"), NodeKind::Build),
                node(stack, format!("SAM/CFN Stack ({env})"), NodeKind::Stack),
                node(lambda, format!("Lambda (alias: {env})"), NodeKind::Compute),
                node(api, format!("API Gateway ({env})"), NodeKind::Api),
            ],
            clusters: Vec::new(),
        })
        .collect();

    let clusters = vec![
        Cluster {
            label: "Developer",
            nodes: vec![node("gh", "GitHub Repo", NodeKind::Vcs)],
            clusters: Vec::new(),
        },
        Cluster {
            label: "AWS",
            nodes: vec![
                node("cp", "CodePipeline", NodeKind::Pipeline),
                node("s3", "S3 (artifacts, versioned, private)", NodeKind::Storage),
                node("cb_build", "CodeBuild: Build & Test", NodeKind::Build),
                node("ssm", "SSM Params + Secrets Manager", NodeKind::Config),
                node("kms", "KMS", NodeKind::Security),
                node("cw", "CloudWatch Logs & Metrics", NodeKind::Monitoring),
                node("eb", "EventBridge (failures)", NodeKind::Events),
                node("sns", "SNS → Slack/Email", NodeKind::Notify),
            ],
            clusters: vec![Cluster {
                label: "Environments",
                nodes: Vec::new(),
                clusters: environments,
            }],
        },
    ];

    let mut edges = vec![
        edge("gh", "cp", step(1)),
        edge("cp", "s3", step(2)),
        edge("s3", "cb_build", step(3)),
        dashed("ssm", "cb_build", Some("read minimal".into())),
        dashed("kms", "ssm", None),
        edge("cb_build", "s3", step(4)),
    ];

    for (env, deploy, stack, lambda, api) in ENVIRONMENTS {
        let entry = if env == "prod" {
            edge("cp", deploy, step(7))
        } else {
            let label = step(5).map(|l| l.replace("(env)", &format!("({env})")));
            edge("s3", deploy, label)
        };
        edges.push(entry);
        edges.push(edge(deploy, stack, None));
        edges.push(edge(stack, lambda, None));
        edges.push(edge(lambda, api, None));
    }
    edges.push(edge("api_dev", "cw", step(6)));
    edges.push(edge("lam_prod", "cw", Some("canary/alias".into())));

    let alerting = ["cp", "cb_build"]
        .into_iter()
        .chain(ENVIRONMENTS.iter().map(|e| e.1))
        .chain(ENVIRONMENTS.iter().map(|e| e.2))
        .chain(ENVIRONMENTS.iter().map(|e| e.3));
    for source in alerting {
        edges.push(dashed(source, "eb", step(8)));
    }
    edges.push(edge("eb", "sns", None));

    Graph {
        title: "CI/CD (AWS) - Lambda path",
        clusters,
        edges,
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

impl Graph {
    /// Every node, depth first through the clusters.
    pub fn nodes(&self) -> Vec<&Node> {
        fn walk<'a>(cluster: &'a Cluster, out: &mut Vec<&'a Node>) {
            out.extend(cluster.nodes.iter());
            for child in &cluster.clusters {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for cluster in &self.clusters {
            walk(cluster, &mut out);
        }
        out
    }

    /// Left-to-right DOT rendering.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(self.title));
        let _ = writeln!(out, "  label={};", quote(self.title));
        out.push_str("  labelloc=t;\n  rankdir=LR;\n  fontname=\"Sans-Serif\";\n");
        out.push_str("  node [fontname=\"Sans-Serif\", fontsize=11, style=filled, fontcolor=white];\n");
        out.push_str("  edge [fontname=\"Sans-Serif\", fontsize=9, color=\"#7b8894\"];\n");

        let mut next_cluster = 0;
        for cluster in &self.clusters {
            write_cluster(&mut out, cluster, 1, &mut next_cluster);
        }

        for e in &self.edges {
            let mut attrs = Vec::new();
            if let Some(label) = &e.label {
                attrs.push(format!("label={}", quote(label)));
            }
            if e.dashed {
                attrs.push("style=dashed".to_string());
            }
            let attrs = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };
            let _ = writeln!(out, "  {} -> {}{attrs};", e.from, e.to);
        }
        out.push_str("}\n");
        out
    }

    /// Write `<output>.dot` and return its path.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_dot(&self, output: &Path) -> Result<PathBuf> {
        let path = output.with_extension("dot");
        std::fs::write(&path, self.to_dot())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), edges = self.edges.len(), "Wrote diagram");
        Ok(path)
    }

    /// Rasterize `dot_path` with Graphviz into `<output>.<format>`.
    ///
    /// # Errors
    ///
    /// Fails if `dot` is not installed or exits unsuccessfully.
    pub fn render(&self, dot_path: &Path, output: &Path, format: RenderFormat) -> Result<PathBuf> {
        let image = output.with_extension(format.extension());
        let result = Command::new("dot")
            .arg(format!("-T{}", format.extension()))
            .arg("-o")
            .arg(&image)
            .arg(dot_path)
            .output()
            .context("Failed to run Graphviz `dot` (is graphviz installed?)")?;
        if !result.status.success() {
            bail!(
                "dot exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }
        tracing::info!(path = %image.display(), "Rendered diagram");
        Ok(image)
    }
}

fn write_cluster(out: &mut String, cluster: &Cluster, depth: usize, next: &mut usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}subgraph cluster_{} {{", *next);
    *next += 1;
    let _ = writeln!(out, "{pad}  label={};", quote(cluster.label));
    let _ = writeln!(out, "{pad}  style=rounded; bgcolor=\"#f4f6f8\";");
    for n in &cluster.nodes {
        let (shape, color) = n.kind.style();
        let _ = writeln!(
            out,
            "{pad}  {} [label={}, shape={shape}, fillcolor=\"{color}\"];",
            n.id,
            quote(&n.label)
        );
    }
    for child in &cluster.clusters {
        write_cluster(out, child, depth + 1, next);
    }
    let _ = writeln!(out, "{pad}}}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_edge_endpoint_is_declared() {
        let graph = cicd_lambda();
        let ids: HashSet<&str> = graph.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), graph.nodes().len(), "duplicate node id");
        for e in &graph.edges {
            assert!(ids.contains(e.from), "unknown source {}", e.from);
            assert!(ids.contains(e.to), "unknown target {}", e.to);
        }
    }

    #[test]
    fn node_and_edge_counts() {
        let graph = cicd_lambda();
        assert_eq!(graph.nodes().len(), 21);
        // 6 core + 4 per environment + smoke + canary + 11 alerts + eb->sns
        assert_eq!(graph.edges.len(), 6 + 12 + 2 + 11 + 1);
    }

    #[test]
    fn numbered_steps_one_through_eight_appear() {
        let dot = cicd_lambda().to_dot();
        for n in 1..=8 {
            assert!(dot.contains(&format!("label=\"{n}  ")), "missing step {n}");
        }
        assert!(dot.contains("label=\"5  Deploy (dev)\""));
        assert!(dot.contains("label=\"5  Deploy (stage)\""));
        assert!(!dot.contains("(env)"));
    }

    #[test]
    fn dashed_edges() {
        let graph = cicd_lambda();
        let dashed: Vec<_> = graph.edges.iter().filter(|e| e.dashed).collect();
        assert_eq!(dashed.len(), 13);
        assert!(dashed
            .iter()
            .any(|e| e.from == "ssm" && e.label.as_deref() == Some("read minimal")));
        assert!(cicd_lambda()
            .to_dot()
            .contains("ssm -> cb_build [label=\"read minimal\", style=dashed];"));
    }

    #[test]
    fn dot_is_left_to_right_with_nested_clusters() {
        let dot = cicd_lambda().to_dot();
        assert!(dot.starts_with("digraph \"CI/CD (AWS) - Lambda path\" {"));
        assert!(dot.contains("rankdir=LR;"));
        for label in ["Developer", "AWS", "Environments", "dev", "stage", "prod"] {
            assert!(dot.contains(&format!("label=\"{label}\";")), "missing cluster {label}");
        }
        assert_eq!(dot.matches("subgraph cluster_").count(), 6);
        assert_eq!(dot.matches('{').count(), dot.matches('}').count());
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }

    #[test]
    fn write_dot_uses_dot_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = cicd_lambda().write_dot(&dir.path().join("cicd_lambda")).unwrap();
        assert_eq!(path, dir.path().join("cicd_lambda.dot"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("gh -> cp [label=\"1  Push/Merge\"];"));
    }
}
