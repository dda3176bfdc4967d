//! Method routing and fault translation
//!
//! The dispatcher is the only place a typed [`RpcError`] becomes a wire
//! [`Fault`]. Params are positional, XML-RPC style: a JSON array whose
//! elements line up with the method signature.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, info_span};
use ulid::Ulid;

use crate::core::permission::{Caller, PermissionOracle};
use crate::rpc::testcase::TestCaseService;
use crate::rpc::{Fault, RpcError};

/// Methods exposed under the `TestCase` namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Update,
    AddTag,
    RemoveTag,
    AddComponent,
    RemoveComponent,
    AddNotificationCc,
    RemoveNotificationCc,
    GetNotificationCc,
    GetComponents,
    Filter,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::Update,
        Method::AddTag,
        Method::RemoveTag,
        Method::AddComponent,
        Method::RemoveComponent,
        Method::AddNotificationCc,
        Method::RemoveNotificationCc,
        Method::GetNotificationCc,
        Method::GetComponents,
        Method::Filter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Update => "TestCase.update",
            Method::AddTag => "TestCase.add_tag",
            Method::RemoveTag => "TestCase.remove_tag",
            Method::AddComponent => "TestCase.add_component",
            Method::RemoveComponent => "TestCase.remove_component",
            Method::AddNotificationCc => "TestCase.add_notification_cc",
            Method::RemoveNotificationCc => "TestCase.remove_notification_cc",
            Method::GetNotificationCc => "TestCase.get_notification_cc",
            Method::GetComponents => "TestCase.get_components",
            Method::Filter => "TestCase.filter",
        }
    }

    /// Positional parameter list, for help text and decode errors
    pub fn signature(&self) -> &'static str {
        match self {
            Method::Update => "[case_id, {field: value}]",
            Method::AddTag | Method::RemoveTag => "[case_id, tag_name]",
            Method::AddComponent | Method::RemoveComponent => "[case_id, component_name]",
            Method::AddNotificationCc | Method::RemoveNotificationCc => "[case_id, [email, ...]]",
            Method::GetNotificationCc | Method::GetComponents => "[case_id]",
            Method::Filter => "[{field__lookup: value}]",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Method {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| RpcError::MethodNotFound(s.to_string()))
    }
}

/// A call as it arrives from the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Username asserted by the transport; resolved before dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Either a result or a fault, echoing the request id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            fault: None,
        }
    }

    pub fn failure(id: Option<Value>, fault: Fault) -> Self {
        Self {
            id,
            result: None,
            fault: Some(fault),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}

/// Routes method names to [`TestCaseService`] handlers
#[derive(Debug, Clone)]
pub struct Dispatcher<O> {
    service: TestCaseService<O>,
}

impl<O: PermissionOracle> Dispatcher<O> {
    pub fn new(service: TestCaseService<O>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TestCaseService<O> {
        &self.service
    }

    /// Invoke `method` for an already-resolved caller
    pub fn call(&self, caller: &Caller, method: &str, params: Value) -> Result<Value, RpcError> {
        let span = info_span!(
            "rpc",
            method,
            user = %caller.username,
            request_id = %Ulid::new()
        );
        let _enter = span.enter();

        let result = method
            .parse::<Method>()
            .and_then(|method| self.invoke(caller, method, params));

        match &result {
            Ok(_) => debug!("call succeeded"),
            Err(error) => info!(code = error.code(), %error, "call failed"),
        }
        result
    }

    /// Invoke a request and wrap the outcome in a response envelope
    pub fn handle(&self, caller: &Caller, request: Request) -> Response {
        match self.call(caller, &request.method, request.params) {
            Ok(result) => Response::success(request.id, result),
            Err(error) => Response::failure(request.id, error.to_fault()),
        }
    }

    fn invoke(&self, caller: &Caller, method: Method, params: Value) -> Result<Value, RpcError> {
        let service = &self.service;
        match method {
            Method::Update => {
                let (case_id, fields): (i64, Map<String, Value>) = decode(method, params)?;
                encode(service.update(caller, case_id, &fields)?)
            }
            Method::AddTag => {
                let (case_id, tag): (i64, String) = decode(method, params)?;
                service.add_tag(caller, case_id, &tag)?;
                Ok(Value::Null)
            }
            Method::RemoveTag => {
                let (case_id, tag): (i64, String) = decode(method, params)?;
                service.remove_tag(caller, case_id, &tag)?;
                Ok(Value::Null)
            }
            Method::AddComponent => {
                let (case_id, name): (i64, String) = decode(method, params)?;
                encode(service.add_component(caller, case_id, &name)?)
            }
            Method::RemoveComponent => {
                let (case_id, name): (i64, String) = decode(method, params)?;
                encode(service.remove_component(caller, case_id, &name)?)
            }
            Method::AddNotificationCc => {
                let (case_id, emails): (i64, Vec<String>) = decode(method, params)?;
                service.add_notification_cc(caller, case_id, &emails)?;
                Ok(Value::Null)
            }
            Method::RemoveNotificationCc => {
                let (case_id, emails): (i64, Vec<String>) = decode(method, params)?;
                service.remove_notification_cc(caller, case_id, &emails)?;
                Ok(Value::Null)
            }
            Method::GetNotificationCc => {
                let (case_id,): (i64,) = decode(method, params)?;
                encode(service.get_notification_cc(caller, case_id)?)
            }
            Method::GetComponents => {
                let (case_id,): (i64,) = decode(method, params)?;
                encode(service.get_components(caller, case_id)?)
            }
            Method::Filter => {
                let (criteria,): (Map<String, Value>,) = decode(method, params)?;
                encode(service.filter(&criteria)?)
            }
        }
    }
}

impl<O: PermissionOracle + Sync> Dispatcher<O> {
    /// Handle requests on at most `available_parallelism` worker threads;
    /// responses keep input order
    pub fn handle_all(&self, requests: Vec<(Caller, Request)>) -> Vec<Response> {
        let width = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        self.handle_all_with(requests, width)
    }

    /// Handle requests in chunks of `width`, one scoped thread per request in a chunk
    pub fn handle_all_with(&self, requests: Vec<(Caller, Request)>, width: usize) -> Vec<Response> {
        let width = width.max(1);
        let mut responses = Vec::with_capacity(requests.len());
        let mut pending = requests.into_iter().peekable();

        while pending.peek().is_some() {
            let chunk: Vec<_> = pending.by_ref().take(width).collect();
            debug!(size = chunk.len(), "dispatching batch chunk");
            std::thread::scope(|scope| {
                let workers: Vec<_> = chunk
                    .into_iter()
                    .map(|(caller, request)| {
                        let id = request.id.clone();
                        let worker = scope.spawn(move || self.handle(&caller, request));
                        (id, worker)
                    })
                    .collect();

                for (id, worker) in workers {
                    responses.push(worker.join().unwrap_or_else(|_| {
                        Response::failure(
                            id,
                            RpcError::Internal("worker panicked".to_string()).to_fault(),
                        )
                    }));
                }
            });
        }
        responses
    }
}

fn decode<T: DeserializeOwned>(method: Method, params: Value) -> Result<T, RpcError> {
    let params = match params {
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    serde_json::from_value(params).map_err(|e| {
        RpcError::validation(format!(
            "{} expects {}: {}",
            method.name(),
            method.signature(),
            e
        ))
    })
}

fn encode<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}
