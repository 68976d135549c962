
// re-exporting functions
mod report;  pub use report::*;
mod dot;     pub use dot::DotConf;
mod escaper; pub use escaper::*;
