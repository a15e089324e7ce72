//! Client implementations over concrete HTTP engines

#[cfg(feature = "reqwest")]
pub mod reqwest_backend;
#[cfg(feature = "ureq")]
pub mod ureq_backend;

#[cfg(feature = "reqwest")]
pub use reqwest_backend::ReqwestClient;
#[cfg(feature = "ureq")]
pub use ureq_backend::UreqClient;
