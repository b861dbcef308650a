//! The elaborator: evaluation, unification and bidirectional type checking for the core calculus.
use std::rc::Rc;

use crate::common::*;
use crate::config::Config;
use crate::error::ElabError;
use crate::pretty::{Doc, Prec};

mod cxt;
mod elaborate;
mod globals;
mod instance;
mod metas;
pub mod prims;
mod term;
mod unify;
mod val;
mod var;
mod verify;
mod zonk;

pub use cxt::*;
pub use globals::*;
pub use metas::*;
pub use term::*;
pub use unify::UnifyCxt;
pub use val::*;
pub use var::*;
pub use verify::*;
