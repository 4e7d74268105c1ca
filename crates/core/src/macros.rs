// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`]: `Display` impl mapping enum variants to string literals
//! - [`update_kinds!`]: `From<Kind> for Update` conversions for every update payload

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar(..) => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate `From<Payload> for Update` for payload structs whose type name
/// matches the `Update` variant name.
///
/// ```ignore
/// crate::update_kinds!(BuildSource, JobState, StdOut);
/// ```
#[macro_export]
macro_rules! update_kinds {
    ($( $kind:ident ),+ $(,)?) => {
        $(
            impl From<$kind> for $crate::update::Update {
                fn from(u: $kind) -> Self {
                    $crate::update::Update::$kind(u)
                }
            }
        )+
    };
}
