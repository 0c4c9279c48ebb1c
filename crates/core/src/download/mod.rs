//! Retrieval of converted artifacts.
//!
//! Every completed conversion yields a [`RetrievalOffer`] naming the artifact
//! and a suggested file name (`<base name>.<operation extension>`). A
//! [`DownloadTrigger`] consumes those offers and hands the bytes to a
//! [`Retriever`], such as a [`DirectoryRetriever`] writing into the output
//! directory.

mod config;
mod error;
mod retriever;
mod trigger;

pub use config::OutputConfig;
pub use error::RetrievalError;
pub use retriever::{suggested_filename, DirectoryRetriever, Retriever};
pub use trigger::{DownloadTrigger, RetrievalOffer, TriggerSummary};
