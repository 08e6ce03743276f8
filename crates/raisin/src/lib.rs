#![doc = include_str!("../../../README.md")]

mod args;
pub mod builtins;
mod capture;
mod compare;
mod dispatch;
mod error;
mod exception;
mod fallback;
mod info;
mod pattern;
mod raised;
mod registry;

#[doc(hidden)]
pub use crate::exception::ErasedException;
pub use crate::{
    args::{Arg, Args, StrRepr},
    capture::{Capture, CaptureState, Exit, ExpectedException, ScopedCapture},
    compare::{Comparator, CompareResult, Mismatch, default_compare},
    dispatch::{Dispatcher, Expected, Raises, RaisesOptions, raises, raises_with, register, register_many},
    error::RaisesError,
    exception::{Exception, ExceptionType},
    fallback::TypeCapture,
    info::{CapturedException, ExceptionInfo},
    raised::{Outcome, Raised, Traceback},
    registry::{ComparatorRegistry, Registration},
};
