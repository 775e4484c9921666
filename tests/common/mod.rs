//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use netconf_agent::config::AgentConfig;
use netconf_agent::datastore::Datastores;
use netconf_agent::lifecycle::Shutdown;
use netconf_agent::model::ConfigTree;
use netconf_agent::rpc::{Dispatcher, RpcMessage, RpcReply};
use netconf_agent::schema::builtin::monitoring_module;
use netconf_agent::schema::Schema;
use netconf_agent::session::{SessionId, SessionRegistry};
use netconf_agent::validate::SchemaValidator;
use netconf_agent::HttpServer;

pub const MODULES: &str = include_str!("../fixtures/modules.toml");

pub fn schema() -> Arc<Schema> {
    let mut schema = Schema::from_toml_str(MODULES).expect("fixture modules load");
    schema
        .add_module(monitoring_module())
        .expect("monitoring module loads");
    Arc::new(schema)
}

pub fn dispatcher_with(candidate: bool, max_sessions: usize) -> Dispatcher {
    let schema = schema();
    Dispatcher::new(
        schema.clone(),
        Arc::new(SchemaValidator::new(schema)),
        Datastores::new(ConfigTree::new(), candidate),
        SessionRegistry::new(max_sessions),
    )
}

pub fn dispatcher() -> Dispatcher {
    dispatcher_with(true, 16)
}

/// One session driving a dispatcher directly.
pub struct Client<'a> {
    pub dispatcher: &'a Dispatcher,
    pub session: SessionId,
    next_message: u64,
}

impl<'a> Client<'a> {
    pub fn open(dispatcher: &'a Dispatcher) -> Self {
        let info = dispatcher
            .open_session("tester", "test", Some("127.0.0.1".to_string()))
            .expect("session opens");
        Self {
            dispatcher,
            session: info.id,
            next_message: 1,
        }
    }

    pub fn rpc(&mut self, mut body: Value) -> RpcReply {
        body["message-id"] = json!(self.next_message.to_string());
        self.next_message += 1;
        let message: RpcMessage = serde_json::from_value(body).expect("valid rpc body");
        self.dispatcher.handle(self.session, message)
    }

    pub fn edit(&mut self, config: Value) -> RpcReply {
        self.rpc(json!({"operation": "edit-config", "target": "running", "config": config}))
    }

    pub fn edit_target(&mut self, target: &str, config: Value) -> RpcReply {
        self.rpc(json!({"operation": "edit-config", "target": target, "config": config}))
    }

    /// `get-config` on running, returned as the JSON text of the data array.
    pub fn get_config(&mut self) -> String {
        self.get_config_from("running", None)
    }

    pub fn get_config_from(&mut self, source: &str, filter: Option<Value>) -> String {
        let mut body = json!({"operation": "get-config", "source": source});
        if let Some(filter) = filter {
            body["filter"] = filter;
        }
        let reply = self.rpc(body);
        assert_ok(&reply);
        serde_json::to_string(&reply.data.expect("data reply")).expect("serializable")
    }

    pub fn get_config_value(&mut self, filter: Option<Value>) -> Value {
        serde_json::from_str(&self.get_config_from("running", filter)).expect("json")
    }
}

pub fn assert_ok(reply: &RpcReply) {
    assert!(!reply.is_error(), "unexpected rpc-error: {:?}", reply.errors);
}

pub fn error_tag(reply: &RpcReply) -> String {
    let error = reply.errors.first().expect("an rpc-error");
    serde_json::to_value(error.error_tag)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .expect("tag serializes to a string")
}

pub const EMPTY: &str = "[]";

// Payloads mirroring the RFC 6241 section 7.2 examples and the simple
// ed1/ed2/ed3 modules.

pub fn ed1(value: &str, operation: Option<&str>) -> Value {
    let mut node = json!({"name": "first", "namespace": "ed1", "value": value});
    if let Some(op) = operation {
        node["operation"] = json!(op);
    }
    json!([node])
}

pub fn ed2(name: &str, num: Option<i64>, operation: Option<&str>) -> Value {
    let mut children = vec![json!({"name": "name", "value": name})];
    if let Some(num) = num {
        children.push(json!({"name": "num", "value": num}));
    }
    let mut node = json!({"name": "top", "namespace": "ed2", "children": children});
    if let Some(op) = operation {
        node["operation"] = json!(op);
    }
    json!([node])
}

pub fn ed3(name: &str, nums: &[i64], operation: Option<&str>) -> Value {
    let mut children = vec![json!({"name": "name", "value": name})];
    children.extend(nums.iter().map(|n| json!({"name": "num", "value": n})));
    let mut node = json!({"name": "top", "namespace": "ed3", "children": children});
    if let Some(op) = operation {
        node["operation"] = json!(op);
    }
    json!([node])
}

pub fn rfc2_area(name: &str, interfaces: &[&str]) -> Value {
    json!({"name": "area", "children": [
        {"name": "name", "value": name},
        {"name": "interfaces", "children": interfaces
            .iter()
            .map(|i| json!({"name": "interface", "children": [{"name": "name", "value": i}]}))
            .collect::<Vec<_>>()}
    ]})
}

pub fn rfc2(areas: Vec<Value>, operation: Option<&str>) -> Value {
    let mut node = json!({"name": "top", "namespace": "rfc2", "children": [
        {"name": "protocols", "children": [{"name": "ospf", "children": areas}]}
    ]});
    if let Some(op) = operation {
        node["operation"] = json!(op);
    }
    json!([node])
}

pub fn rfc2_complex() -> Value {
    rfc2(
        vec![
            rfc2_area("0.0.0.0", &["192.0.2.1", "192.0.2.4"]),
            rfc2_area("192.168.0.0", &["192.168.0.1", "192.168.0.12", "192.168.0.25"]),
        ],
        None,
    )
}

/// Start an HTTP server on an ephemeral port.
pub async fn spawn_server(
    config: AgentConfig,
    dispatcher: Dispatcher,
) -> (SocketAddr, Shutdown, Arc<Dispatcher>, JoinHandle<()>) {
    let dispatcher = Arc::new(dispatcher);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, dispatcher.clone());
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown, dispatcher, handle)
}
