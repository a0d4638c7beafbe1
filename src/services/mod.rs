pub mod classifier;
pub mod dispatcher;
pub mod translator;
pub mod validator;
