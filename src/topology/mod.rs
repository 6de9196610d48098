pub mod validator;

pub use validator::TopologyValidator;
