mod collection;
mod condition;
mod descriptor;
mod error;
mod record;
mod row;
mod storage;
mod value;

pub use ::anyhow::Context;
pub use collection::*;
pub use condition::*;
pub use descriptor::*;
pub use error::*;
pub use record::*;
pub use row::*;
pub use storage::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
