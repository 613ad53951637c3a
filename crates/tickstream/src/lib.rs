#![doc = include_str!("../README.md")]

mod codec;
mod connector;
mod consumer;
mod error;
mod producer;
mod sequence;
mod sleep;

pub use crate::codec::*;
pub use crate::connector::*;
pub use crate::consumer::*;
pub use crate::error::*;
pub use crate::producer::*;
pub use crate::sequence::*;
pub use crate::sleep::*;
