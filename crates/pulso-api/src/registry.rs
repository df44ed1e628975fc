//! Static procedure registry: the dispatch table mapping dotted operation
//! names to authorization tier, input shape and handler. Built once at
//! startup (duplicate names are a construction error) and dispatched by
//! exact name match.

use std::collections::HashMap;
use std::future::Future;

use anyhow::bail;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::RequestCtx;
use crate::error::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Callable without a resolved user; handlers see `ctx.user` as-is.
    Public,
    /// Requires a resolved user; fails `Unauthorized` before the handler
    /// body runs, so an anonymous call has no side effects.
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

type Handler =
    Box<dyn Fn(RequestCtx, Value) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync>;

pub struct Procedure {
    name: &'static str,
    kind: ProcedureKind,
    access: Access,
    handler: Handler,
}

impl Procedure {
    pub fn query<I, O, F, Fut>(name: &'static str, access: Access, f: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(RequestCtx, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        Self::build(name, ProcedureKind::Query, access, f)
    }

    pub fn mutation<I, O, F, Fut>(name: &'static str, access: Access, f: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(RequestCtx, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        Self::build(name, ProcedureKind::Mutation, access, f)
    }

    fn build<I, O, F, Fut>(name: &'static str, kind: ProcedureKind, access: Access, f: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(RequestCtx, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
    {
        let handler: Handler = Box::new(move |ctx, raw| {
            let fut: BoxFuture<'static, Result<Value, RpcError>> = match decode_input::<I>(raw) {
                Ok(input) => {
                    let fut = f(ctx, input);
                    Box::pin(async move {
                        let output = fut.await?;
                        serde_json::to_value(output).map_err(|_| RpcError::Internal)
                    })
                }
                Err(e) => Box::pin(async move { Err(e) }),
            };
            fut
        });

        Self {
            name,
            kind,
            access,
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn access(&self) -> Access {
        self.access
    }
}

/// Typed input validation: the handler body never runs on a shape
/// mismatch. A null/absent input is accepted where the declared shape
/// allows it (no payload, or all fields optional).
fn decode_input<I: DeserializeOwned>(raw: Value) -> Result<I, RpcError> {
    if raw.is_null() {
        if let Ok(input) = serde_json::from_value::<I>(Value::Null) {
            return Ok(input);
        }
        return serde_json::from_value::<I>(Value::Object(serde_json::Map::new()))
            .map_err(|e| RpcError::Validation(e.to_string()));
    }
    serde_json::from_value(raw).map_err(|e| RpcError::Validation(e.to_string()))
}

pub struct ProcedureRegistry {
    procedures: HashMap<&'static str, Procedure>,
}

impl ProcedureRegistry {
    pub fn new(procedures: Vec<Procedure>) -> anyhow::Result<Self> {
        let mut map = HashMap::with_capacity(procedures.len());
        for procedure in procedures {
            let name = procedure.name;
            if map.insert(name, procedure).is_some() {
                bail!("duplicate procedure name: {name}");
            }
        }
        Ok(Self { procedures: map })
    }

    pub fn get(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Dispatch by exact dotted name. The access tier is checked before
    /// input validation and the handler body.
    pub async fn dispatch(
        &self,
        name: &str,
        ctx: RequestCtx,
        input: Value,
    ) -> Result<Value, RpcError> {
        let procedure = self
            .procedures
            .get(name)
            .ok_or_else(|| RpcError::NotFound(name.to_string()))?;

        if procedure.access == Access::Protected && ctx.user.is_none() {
            return Err(RpcError::Unauthorized);
        }

        (procedure.handler)(ctx, input).await
    }
}
