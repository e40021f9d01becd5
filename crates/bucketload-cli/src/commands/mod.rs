pub mod check;
pub mod diagram;
pub mod run;
