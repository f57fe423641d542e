//! Message names, payloads and diagram element parsing

use crate::{Error, RawEvent, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

// Outbound event names
pub const SEND_API_AUTHORIZE: &str = "api-authorize";
pub const SEND_GAME_INIT: &str = "game-init";
pub const SEND_GAME_EVENT: &str = "game-event";

// Inbound event names
pub const RECEIVE_OPEN_START: &str = "open-start";
pub const RECEIVE_OPEN: &str = "open";
pub const RECEIVE_ERROR: &str = "error";
pub const RECEIVE_API_ERROR: &str = "api-error";
pub const RECEIVE_AUTH_SUCCESS: &str = "api-auth-success";
pub const RECEIVE_AUTH_DENY: &str = "api-auth-deny";
pub const RECEIVE_GAME_INIT: &str = "game-init";
pub const RECEIVE_DIAGRAM_ELEMENTS_UPDATED: &str = "diagram-elements-updated";
pub const RECEIVE_CLOSE: &str = "close";

/// Connection query parameter carrying the user key
pub const QUERY_USER_KEY: &str = "userKey";

/// Key holding the element list in init responses and updates
pub const KEY_DIAGRAM_ELEMENTS: &str = "diagramElements";

// Diagram element properties
pub const PROP_ID: &str = "id";
pub const PROP_TYPE: &str = "type";
pub const PROP_LABEL: &str = "label";
pub const PROP_ACTIVATION: &str = "activation";
pub const PROP_ACTION: &str = "action";
pub const PROP_RESOURCES: &str = "resources";
pub const PROP_CAPACITY: &str = "capacity";
pub const PROP_OVERFLOW: &str = "overflow";

/// Properties requested for every element in `game-init`
pub const REQUESTED_PROPS: [&str; 6] = [
    PROP_LABEL,
    PROP_ACTIVATION,
    PROP_ACTION,
    PROP_RESOURCES,
    PROP_CAPACITY,
    PROP_OVERFLOW,
];

/// Credentials a host transport presents when it opens the connection
///
/// Not an event: the user key travels with the connection request itself,
/// before `api-authorize` is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub user_key: String,
}

impl Handshake {
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
        }
    }

    /// Query pairs to append to the connection URL
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        vec![(QUERY_USER_KEY, self.user_key.as_str())]
    }
}

/// `api-authorize` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub game_name: String,
    pub diagram_token: String,
}

/// One element asked for in `game-init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRequest {
    pub id: i64,
    pub props: Vec<String>,
}

impl ElementRequest {
    /// Request the standard property set for an element
    pub fn new(id: i64) -> Self {
        Self {
            id,
            props: REQUESTED_PROPS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// `game-init` request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    pub diagram_token: String,
    #[serde(rename = "machinationsIDs")]
    pub element_ids: Vec<ElementRequest>,
}

impl InitRequest {
    /// Build a request for the given ids, skipping duplicates
    pub fn new(diagram_token: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        let mut element_ids: Vec<ElementRequest> = Vec::new();
        for id in ids {
            if !element_ids.iter().any(|r| r.id == id) {
                element_ids.push(ElementRequest::new(id));
            }
        }
        Self {
            diagram_token: diagram_token.into(),
            element_ids,
        }
    }
}

/// `game-event` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEventMessage {
    pub game_obj_name: String,
    pub game_event: String,
}

/// A diagram element as sent by the backend
///
/// Every property is kept as text, the way the backend means it; numbers
/// and strings are accepted interchangeably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramElement {
    pub id: i64,
    pub props: BTreeMap<String, String>,
}

impl DiagramElement {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            props: BTreeMap::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn label(&self) -> Option<&str> {
        self.prop(PROP_LABEL)
    }

    /// `resources`, if present and an integer
    pub fn resources(&self) -> Option<i64> {
        self.prop(PROP_RESOURCES).and_then(|s| s.trim().parse().ok())
    }

    /// `capacity`, if present and an integer
    pub fn capacity(&self) -> Option<i64> {
        self.prop(PROP_CAPACITY).and_then(|s| s.trim().parse().ok())
    }

    /// Parse one element object
    pub fn from_json(event: &str, json: &Json) -> Result<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::malformed(event, "element is not an object"))?;

        let id = object
            .get(PROP_ID)
            .and_then(json_text)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| Error::malformed(event, "element has no integer id"))?;

        let props = object
            .iter()
            .filter(|(key, _)| key.as_str() != PROP_ID)
            .filter_map(|(key, value)| json_text(value).map(|text| (key.clone(), text)))
            .collect();

        Ok(Self { id, props })
    }

    /// Render back to the backend's JSON shape
    pub fn to_json(&self) -> Json {
        let mut object = serde_json::Map::new();
        object.insert(PROP_ID.to_string(), Json::from(self.id));
        for (key, value) in &self.props {
            object.insert(key.clone(), Json::from(value.as_str()));
        }
        Json::Object(object)
    }
}

/// Text form of a scalar JSON value; `null`, arrays and objects yield `None`
fn json_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse the `diagramElements` list out of a payload
pub fn parse_elements(event: &str, payload: &Json) -> Result<Vec<DiagramElement>> {
    let list = payload
        .get(KEY_DIAGRAM_ELEMENTS)
        .and_then(Json::as_array)
        .ok_or_else(|| Error::malformed(event, "missing diagramElements list"))?;
    list.iter()
        .map(|element| DiagramElement::from_json(event, element))
        .collect()
}

/// Build a payload carrying a list of elements
pub fn elements_payload(elements: &[DiagramElement]) -> Json {
    let list = elements.iter().map(DiagramElement::to_json).collect();
    let mut object = serde_json::Map::new();
    object.insert(KEY_DIAGRAM_ELEMENTS.to_string(), Json::Array(list));
    Json::Object(object)
}

/// An inbound event, decoded
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Transport is opening
    OpenStart,
    /// Transport opened
    Open,
    AuthSuccess,
    AuthDeny(String),
    /// Response to `game-init`
    Init(Vec<DiagramElement>),
    /// Unsolicited live update
    ElementsUpdated(Vec<DiagramElement>),
    /// Transport or API failure
    Error(String),
    Close,
    /// Anything else; event names are opaque
    Other(String),
}

impl Inbound {
    /// Decode a raw event by name
    pub fn decode(event: &RawEvent) -> Result<Self> {
        let name = event.name.as_str();
        Ok(match name {
            RECEIVE_OPEN_START => Inbound::OpenStart,
            RECEIVE_OPEN => Inbound::Open,
            RECEIVE_AUTH_SUCCESS => Inbound::AuthSuccess,
            RECEIVE_AUTH_DENY => Inbound::AuthDeny(describe(&event.data)),
            RECEIVE_GAME_INIT => Inbound::Init(parse_elements(name, &event.data)?),
            RECEIVE_DIAGRAM_ELEMENTS_UPDATED => {
                Inbound::ElementsUpdated(parse_elements(name, &event.data)?)
            }
            RECEIVE_ERROR | RECEIVE_API_ERROR => Inbound::Error(describe(&event.data)),
            RECEIVE_CLOSE => Inbound::Close,
            other => Inbound::Other(other.to_string()),
        })
    }
}

fn describe(data: &Json) -> String {
    match data {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode a typed payload for [`crate::Connection::emit`]
pub fn to_payload<T: Serialize>(payload: &T) -> Result<Json> {
    serde_json::to_value(payload).map_err(|e| Error::Serialization(e.to_string()))
}
