// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`display_names!`] — `Display` impl mapping unit variants to wire names
//! - [`builder!`] — test builder struct with Default, setters, and `build()`
//! - [`opt_setters!`] — chained setters that fill `Option` fields

/// Generate a `Display` impl mapping each unit variant of an enum to its
/// wire name. The state and credential enums here are all unit-only, so
/// the mapping is a plain variant → literal table.
///
/// ```ignore
/// mg_core::display_names! {
///     CredentialService {
///         Docker => "docker",
///         Git => "git",
///     }
/// }
/// ```
#[macro_export]
macro_rules! display_names {
    ($enum:ty { $( $variant:ident => $name:literal ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant => $name, )+
                })
            }
        }
    };
}

/// Generate a test builder: one field per line with its seed value, one
/// setter per field taking `impl Into<FieldType>`, and a `build()` that
/// assembles the target. Seed expressions must already have the field's
/// type.
///
/// All generated items are gated behind `#[cfg(any(test, feature =
/// "test-support"))]`.
///
/// ```ignore
/// mg_core::builder! {
///     pub struct JobBuilder => Job {
///         id: JobId = JobId::new("job-1"),
///         priority: f64 = 1.0,
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            $( $field:ident : $ty:ty = $seed:expr ),+ $(,)?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $( $field: $ty, )+
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $( $field: $seed, )+
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $(
                pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                    self.$field = v.into();
                    self
                }
            )+

            pub fn build(self) -> $target {
                $target {
                    $( $field: self.$field, )+
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            /// Create a builder with test defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}

/// Generate chained setters for `Option` fields inside an existing `impl`
/// block: each setter wraps its argument in `Some`.
///
/// ```ignore
/// impl ProcessStateReport {
///     mg_core::opt_setters! {
///         pid: u32,
///         return_code: i32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! opt_setters {
    ( $( $field:ident : $ty:ty ),+ $(,)? ) => {
        $(
            pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                self.$field = Some(v.into());
                self
            }
        )+
    };
}
