pub use arrayvec::{self, ArrayVec};
pub use derive_more;
pub use float_cmp::ApproxEq;
pub use itertools::*;
pub use ordered_float::{NotNan, OrderedFloat};
pub use parking_lot;
pub use rand::{self, prelude::*};
pub use smallvec::{self, *};
pub use thiserror::{self, Error};

pub use lazy_static::lazy_static;
pub use logging::{
    self, prelude::*, slog_kv_debug, slog_kv_display, slog_value_debug, slog_value_display,
};

// misc imports that annoyingly get resolved to other pub exports of std/core
pub use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::Hash,
    iter::{empty, once},
    marker::PhantomData,
};

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[macro_export]
macro_rules! some_or_continue {
    ($opt:expr) => {
        match $opt {
            Some(v) => v,
            None => continue,
        }
    };
}

#[macro_export]
macro_rules! some_or_return {
    ($opt:expr) => {
        match $opt {
            Some(v) => v,
            None => return,
        }
    };
    ($opt:expr, $ret:expr) => {
        match $opt {
            Some(v) => v,
            None => return $ret,
        }
    };
}
