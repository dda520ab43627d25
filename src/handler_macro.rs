//! `rpc_handler!`: declarative binding of a named method to a typed
//! handler body with automatic marshalling (§4.H).
//!
//! This is a `macro_rules!` facility, not a derive/proc-macro — the
//! crate takes on no `syn`/`quote`/`proc-macro2` dependency for it
//! (§9). The handler body must evaluate to `Result<Ret, RpcError>`;
//! `MarshalError` from argument conversion converts into `RpcError`
//! automatically via `?`, and any failure the body itself raises
//! should be an explicit `RpcError::rpc(..)` or `RpcError::Internal`.
//!
//! ```
//! use linerpc::registry::MethodRegistry;
//! use linerpc::rpc_handler;
//!
//! let registry = MethodRegistry::new();
//! rpc_handler!(registry, "rpc", |a: i64, b: i64| -> String {
//!     Ok(format!("a: {a}, b: {b}"))
//! });
//! ```

#[macro_export]
macro_rules! rpc_handler {
    ($registry:expr, $name:expr, |$($arg:ident : $ty:ty),* $(,)?| -> $ret:ty $body:block) => {{
        $registry.register($name, move |__params: ::serde_json::Value| {
            async move {
                let __arity = $crate::rpc_handler!(@count $($arg)*);
                let __args = $crate::marshal::unpack_params(&__params, __arity)?;
                let mut __idx = 0usize;
                $(
                    let $arg: $ty = <$ty as $crate::marshal::FromParam>::from_param(
                        stringify!($arg),
                        &__args[__idx],
                    )?;
                    #[allow(unused_assignments)]
                    { __idx += 1; }
                )*
                let __outcome: Result<$ret, $crate::error::RpcError> = (async move { $body }).await;
                let __value = __outcome?;
                Ok::<::serde_json::Value, $crate::error::RpcError>(
                    $crate::marshal::ToParam::to_param(&__value),
                )
            }
        });
    }};
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => { 1usize + $crate::rpc_handler!(@count $($tail)*) };
}

#[cfg(test)]
mod tests {
    use crate::error::RpcError;
    use crate::registry::MethodRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn generated_handler_marshals_args_and_result() {
        let registry = MethodRegistry::new();
        rpc_handler!(registry, "rpc", |a: i64, b: i64| -> String {
            Ok(format!("a: {a}, b: {b}"))
        });

        let handler = registry.lookup("rpc").unwrap();
        let result = handler.call(json!([1, 2])).await.unwrap();
        assert_eq!(result, json!("a: 1, b: 2"));
    }

    #[tokio::test]
    async fn generated_handler_reports_wrong_param_type() {
        let registry = MethodRegistry::new();
        rpc_handler!(registry, "differentParams", |a: i64, b: String| -> String {
            Ok(format!("{a}-{b}"))
        });

        let handler = registry.lookup("differentParams").unwrap();
        let err = handler.call(json!(["abc", 1])).await.unwrap_err();
        match err {
            RpcError::InvalidParams(e) => assert_eq!(e.param, "a"),
            other => panic!("expected InvalidParams, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generated_handler_propagates_explicit_rpc_error() {
        let registry = MethodRegistry::new();
        rpc_handler!(registry, "makeError", || -> () {
            Err(RpcError::Internal("boom".to_string()))
        });

        let handler = registry.lookup("makeError").unwrap();
        let err = handler.call(json!([])).await.unwrap_err();
        assert!(matches!(err, RpcError::Internal(_)));
    }

    #[tokio::test]
    async fn generated_handler_enforces_arity() {
        let registry = MethodRegistry::new();
        rpc_handler!(registry, "rpc", |a: i64, b: i64| -> String {
            Ok(format!("{a}{b}"))
        });

        let handler = registry.lookup("rpc").unwrap();
        let err = handler.call(json!([1])).await.unwrap_err();
        match err {
            RpcError::InvalidParams(e) => assert_eq!(e.param, "params"),
            other => panic!("expected arity InvalidParams, got {other:?}"),
        }
    }
}
