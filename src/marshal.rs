//! Type-directed marshalling between `serde_json::Value` and native
//! call argument/return types (§4.B).
//!
//! `FromParam` converts an incoming JSON value into a typed argument,
//! naming the offending parameter in any failure so the server can
//! report exactly which argument was wrong. `ToParam` is the inverse,
//! used to marshal a handler's return value back to JSON.

use crate::error::MarshalError;
use serde_json::Value;

/// Convert a JSON value into `Self`, or fail with [`MarshalError`]
/// naming `param` (the declared argument name, used purely for
/// diagnostics — §4.B).
pub trait FromParam: Sized {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError>;
}

/// Convert `Self` into a JSON value for the wire.
pub trait ToParam {
    fn to_param(&self) -> Value;
}

fn expect_kind(param: &str, expected: &str) -> MarshalError {
    MarshalError::new(param, format!("expected {expected}"))
}

impl FromParam for bool {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        value.as_bool().ok_or_else(|| expect_kind(param, "bool"))
    }
}

impl ToParam for bool {
    fn to_param(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_signed_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
                    let n = value.as_i64().ok_or_else(|| expect_kind(param, "int"))?;
                    <$ty>::try_from(n).map_err(|_| MarshalError::new(param, format!("{n} out of range for {}", stringify!($ty))))
                }
            }

            impl ToParam for $ty {
                fn to_param(&self) -> Value {
                    Value::from(*self as i64)
                }
            }
        )+
    };
}

impl_signed_int!(i8, i16, i32, i64, isize);

/// `u8` is modeled as the "byte" shape from §4.B: an Int in `[0, 255]`.
impl FromParam for u8 {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        let n = value.as_i64().ok_or_else(|| expect_kind(param, "int"))?;
        u8::try_from(n).map_err(|_| MarshalError::new(param, format!("{n} out of range for byte [0,255]")))
    }
}

impl ToParam for u8 {
    fn to_param(&self) -> Value {
        Value::from(*self as i64)
    }
}

macro_rules! impl_unsigned_int_narrow {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
                    let n = value.as_i64().ok_or_else(|| expect_kind(param, "int"))?;
                    <$ty>::try_from(n).map_err(|_| MarshalError::new(param, format!("{n} out of range for {}", stringify!($ty))))
                }
            }

            impl ToParam for $ty {
                fn to_param(&self) -> Value {
                    Value::from(*self as i64)
                }
            }
        )+
    };
}

impl_unsigned_int_narrow!(u16, u32);

/// `u64`/`usize` are the "wire quirk" shape from §4.B/§9: the value
/// travels as a *signed* JSON integer, reinterpreted bit-for-bit. This
/// is lossy for a human reading the wire but round-trips exactly
/// between two implementations that apply the same rule, which is all
/// this crate needs (client and server share this code).
impl FromParam for u64 {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        let n = value.as_i64().ok_or_else(|| expect_kind(param, "int"))?;
        Ok(n as u64)
    }
}

impl ToParam for u64 {
    fn to_param(&self) -> Value {
        Value::from(*self as i64)
    }
}

impl FromParam for usize {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        let n = value.as_i64().ok_or_else(|| expect_kind(param, "int"))?;
        Ok(n as u64 as usize)
    }
}

impl ToParam for usize {
    fn to_param(&self) -> Value {
        Value::from(*self as u64 as i64)
    }
}

macro_rules! impl_float {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
                    if !value.is_f64() {
                        return Err(expect_kind(param, "float"));
                    }
                    value.as_f64().map(|f| f as $ty).ok_or_else(|| expect_kind(param, "float"))
                }
            }

            impl ToParam for $ty {
                fn to_param(&self) -> Value {
                    serde_json::Number::from_f64(*self as f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
        )+
    };
}

impl_float!(f32, f64);

impl ToParam for () {
    fn to_param(&self) -> Value {
        Value::Null
    }
}

impl FromParam for String {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| expect_kind(param, "string"))
    }
}

impl ToParam for String {
    fn to_param(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToParam for &str {
    fn to_param(&self) -> Value {
        Value::String((*self).to_string())
    }
}

/// Sequences of `T`: require Array kind, each element converted
/// recursively under the same parameter name (§4.B "Sequences of T").
impl<T: FromParam> FromParam for Vec<T> {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        let arr = value.as_array().ok_or_else(|| expect_kind(param, "array"))?;
        arr.iter().map(|v| T::from_param(param, v)).collect()
    }
}

impl<T: ToParam> ToParam for Vec<T> {
    fn to_param(&self) -> Value {
        Value::Array(self.iter().map(ToParam::to_param).collect())
    }
}

/// Optional/nullable `T`: `Null` yields `None`, anything else converts
/// as `T` (§4.B "Nullable/optional T").
impl<T: FromParam> FromParam for Option<T> {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_param(param, value).map(Some)
        }
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Value {
        match self {
            Some(v) => v.to_param(),
            None => Value::Null,
        }
    }
}

/// Fixed arrays of length `N` of `T` (§4.B "Fixed arrays"): the input
/// array must have length `<= N`; elements beyond the supplied count
/// keep `T::default()`; supplying more than `N` is an error.
impl<T: FromParam + Default + Copy, const N: usize> FromParam for [T; N] {
    fn from_param(param: &str, value: &Value) -> Result<Self, MarshalError> {
        let arr = value.as_array().ok_or_else(|| expect_kind(param, "array"))?;
        if arr.len() > N {
            return Err(MarshalError::new(
                param,
                format!("array has {} elements, expected at most {N}", arr.len()),
            ));
        }
        let mut out = [T::default(); N];
        for (slot, v) in out.iter_mut().zip(arr.iter()) {
            *slot = T::from_param(param, v)?;
        }
        Ok(out)
    }
}

impl<T: ToParam, const N: usize> ToParam for [T; N] {
    fn to_param(&self) -> Value {
        Value::Array(self.iter().map(ToParam::to_param).collect())
    }
}

/// Split a `params` value into its positional elements, enforcing
/// exact arity (§4.B "Param-array unpacking"). The argument name
/// reported on failure is `"params"` itself, since arity is a property
/// of the whole call rather than any one argument.
pub fn unpack_params(params: &Value, arity: usize) -> Result<&[Value], MarshalError> {
    let arr = params
        .as_array()
        .ok_or_else(|| MarshalError::new("params", "expected a positional params array"))?;
    if arr.len() != arity {
        return Err(MarshalError::new(
            "params",
            format!("expected {arity} argument(s), got {}", arr.len()),
        ));
    }
    Ok(arr.as_slice())
}

/// Declares a record type (named fields with static types) whose
/// marshalling requires an Object kind and recursively converts each
/// declared field by name, failing with `InvalidParams` on any missing
/// key (§4.B "Records"). This is the declarative-macro realization of
/// the "Records" marshalling shape — no derive/proc-macro is used.
#[macro_export]
macro_rules! json_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( pub $field: $ty ),*
        }

        impl $crate::marshal::FromParam for $name {
            fn from_param(param: &str, value: &serde_json::Value) -> Result<Self, $crate::error::MarshalError> {
                let obj = value
                    .as_object()
                    .ok_or_else(|| $crate::error::MarshalError::new(param, "expected an object"))?;
                Ok($name {
                    $(
                        $field: {
                            let field_name = concat!(stringify!($field));
                            let field_value = obj.get(field_name).ok_or_else(|| {
                                $crate::error::MarshalError::new(
                                    param,
                                    format!("missing field {field_name}"),
                                )
                            })?;
                            <$ty as $crate::marshal::FromParam>::from_param(field_name, field_value)?
                        }
                    ),*
                })
            }
        }

        impl $crate::marshal::ToParam for $name {
            fn to_param(&self) -> serde_json::Value {
                let mut map = serde_json::Map::new();
                $(
                    map.insert(stringify!($field).to_string(), $crate::marshal::ToParam::to_param(&self.$field));
                )*
                serde_json::Value::Object(map)
            }
        }
    };
}
