mod pac_evaluator;
mod resolver;

pub use pac_evaluator::{evaluate_pac, parse_directives};
pub use resolver::PacProxyResolver;
