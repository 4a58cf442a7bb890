//! Static action registry.
//!
//! One table describes every action: wire name, model-facing description,
//! ordered parameter specs, and a builder from a generic JSON argument
//! map. The prompt catalog and the deserializer both read this table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::actions::AgentAction;
use crate::errors::AgentError;

type Args = Map<String, Value>;

/// Primitive parameter types the protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    String,
    Bool,
    StringList,
    StringMap,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::Bool => "bool",
            Self::StringList => "string list",
            Self::StringMap => "string map",
        }
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

/// One action as advertised to the model and accepted from it.
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    build: fn(&Args) -> Result<AgentAction, AgentError>,
}

impl ActionSpec {
    pub fn build(&self, args: &Args) -> Result<AgentAction, AgentError> {
        (self.build)(args)
    }
}

static REGISTRY: &[ActionSpec] = &[
    ActionSpec {
        name: "tap_element",
        description: "Tap the center of the element with the given id.",
        params: &[ParamSpec {
            name: "element_id",
            kind: ParamKind::Int,
            description: "Numeric id from the current screen listing.",
        }],
        build: |args| {
            Ok(AgentAction::TapElement {
                element_id: req_u32(args, "element_id")?,
            })
        },
    },
    ActionSpec {
        name: "long_press_element",
        description: "Long-press the center of the element with the given id.",
        params: &[ParamSpec {
            name: "element_id",
            kind: ParamKind::Int,
            description: "Numeric id from the current screen listing.",
        }],
        build: |args| {
            Ok(AgentAction::LongPressElement {
                element_id: req_u32(args, "element_id")?,
            })
        },
    },
    ActionSpec {
        name: "input_text",
        description: "Type text into the currently focused input field.",
        params: &[ParamSpec {
            name: "text",
            kind: ParamKind::String,
            description: "Text to type.",
        }],
        build: |args| {
            Ok(AgentAction::InputText {
                text: req_string(args, "text")?,
            })
        },
    },
    ActionSpec {
        name: "tap_and_input",
        description: "Tap an input element, type into it, and optionally submit.",
        params: &[
            ParamSpec {
                name: "element_id",
                kind: ParamKind::Int,
                description: "Numeric id of the input element.",
            },
            ParamSpec {
                name: "text",
                kind: ParamKind::String,
                description: "Text to type.",
            },
            ParamSpec {
                name: "submit",
                kind: ParamKind::Bool,
                description: "Press enter after typing when true.",
            },
        ],
        build: |args| {
            Ok(AgentAction::TapAndInput {
                element_id: req_u32(args, "element_id")?,
                text: req_string(args, "text")?,
                submit: opt_bool(args, "submit")?.unwrap_or(false),
            })
        },
    },
    ActionSpec {
        name: "scroll_up",
        description: "Scroll up to reveal content above the viewport.",
        params: &[ParamSpec {
            name: "pixels",
            kind: ParamKind::Int,
            description: "Distance in pixels; most of one screen when omitted.",
        }],
        build: |args| {
            Ok(AgentAction::ScrollUp {
                pixels: opt_i32(args, "pixels")?,
            })
        },
    },
    ActionSpec {
        name: "scroll_down",
        description: "Scroll down to reveal content below the viewport.",
        params: &[ParamSpec {
            name: "pixels",
            kind: ParamKind::Int,
            description: "Distance in pixels; most of one screen when omitted.",
        }],
        build: |args| {
            Ok(AgentAction::ScrollDown {
                pixels: opt_i32(args, "pixels")?,
            })
        },
    },
    ActionSpec {
        name: "open_app",
        description: "Open an installed application by its launcher name.",
        params: &[ParamSpec {
            name: "name",
            kind: ParamKind::String,
            description: "App name, exact or partial.",
        }],
        build: |args| {
            Ok(AgentAction::OpenApp {
                name: req_string(args, "name")?,
            })
        },
    },
    ActionSpec {
        name: "switch_app",
        description: "Bring up the recent-apps switcher.",
        params: &[],
        build: |_| Ok(AgentAction::SwitchApp),
    },
    ActionSpec {
        name: "press_back",
        description: "Press the device back button.",
        params: &[],
        build: |_| Ok(AgentAction::PressBack),
    },
    ActionSpec {
        name: "press_home",
        description: "Go to the home screen.",
        params: &[],
        build: |_| Ok(AgentAction::PressHome),
    },
    ActionSpec {
        name: "wait",
        description: "Pause before looking at the screen again.",
        params: &[ParamSpec {
            name: "seconds",
            kind: ParamKind::Int,
            description: "Seconds to wait, default 1.",
        }],
        build: |args| {
            Ok(AgentAction::Wait {
                seconds: opt_u32(args, "seconds")?.unwrap_or(1),
            })
        },
    },
    ActionSpec {
        name: "speak",
        description: "Say something to the user without waiting for a reply.",
        params: &[ParamSpec {
            name: "text",
            kind: ParamKind::String,
            description: "What to say.",
        }],
        build: |args| {
            Ok(AgentAction::Speak {
                text: req_string(args, "text")?,
            })
        },
    },
    ActionSpec {
        name: "ask_user",
        description: "Ask the user a question and wait for the answer.",
        params: &[ParamSpec {
            name: "question",
            kind: ParamKind::String,
            description: "Question to ask.",
        }],
        build: |args| {
            Ok(AgentAction::AskUser {
                question: req_string(args, "question")?,
            })
        },
    },
    ActionSpec {
        name: "read_file",
        description: "Read a file from the agent file area; contents appear in read_state.",
        params: &[ParamSpec {
            name: "name",
            kind: ParamKind::String,
            description: "File name.",
        }],
        build: |args| {
            Ok(AgentAction::ReadFile {
                name: req_string(args, "name")?,
            })
        },
    },
    ActionSpec {
        name: "write_file",
        description: "Write a file in the agent file area, replacing any existing content.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "File name.",
            },
            ParamSpec {
                name: "content",
                kind: ParamKind::String,
                description: "Content to write.",
            },
        ],
        build: |args| {
            Ok(AgentAction::WriteFile {
                name: req_string(args, "name")?,
                content: req_string(args, "content")?,
            })
        },
    },
    ActionSpec {
        name: "append_file",
        description: "Append to a file in the agent file area.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "File name.",
            },
            ParamSpec {
                name: "content",
                kind: ParamKind::String,
                description: "Content to append.",
            },
        ],
        build: |args| {
            Ok(AgentAction::AppendFile {
                name: req_string(args, "name")?,
                content: req_string(args, "content")?,
            })
        },
    },
    ActionSpec {
        name: "launch_intent",
        description: "Launch a registered external capability by name.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Capability name from the intent catalog.",
            },
            ParamSpec {
                name: "params",
                kind: ParamKind::StringMap,
                description: "String parameters forwarded to the capability.",
            },
        ],
        build: |args| {
            Ok(AgentAction::LaunchIntent {
                name: req_string(args, "name")?,
                params: opt_string_map(args, "params")?,
            })
        },
    },
    ActionSpec {
        name: "done",
        description: "Finish the task and report the outcome. Must be the only action of its step.",
        params: &[
            ParamSpec {
                name: "success",
                kind: ParamKind::Bool,
                description: "Whether the task was accomplished.",
            },
            ParamSpec {
                name: "text",
                kind: ParamKind::String,
                description: "Final report for the user.",
            },
            ParamSpec {
                name: "attachments",
                kind: ParamKind::StringList,
                description: "File names to attach to the final report.",
            },
        ],
        build: |args| {
            Ok(AgentAction::Done {
                success: opt_bool(args, "success")?.unwrap_or(false),
                text: opt_string(args, "text")?.unwrap_or_default(),
                attachments: opt_string_list(args, "attachments")?,
            })
        },
    },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static ActionSpec>> =
    Lazy::new(|| REGISTRY.iter().map(|spec| (spec.name, spec)).collect());

/// All registered actions, in catalog order.
pub fn registry() -> &'static [ActionSpec] {
    REGISTRY
}

/// Look up one action by wire name.
pub fn lookup(name: &str) -> Option<&'static ActionSpec> {
    BY_NAME.get(name).copied()
}

/// Parse one action from a one-key JSON object.
///
/// An unknown name is a hard error, never silently skipped: the mistake
/// has to travel back to the model.
pub fn parse_action(value: &Value) -> Result<AgentAction, AgentError> {
    let object = value
        .as_object()
        .ok_or_else(|| AgentError::protocol("action must be a JSON object"))?;
    if object.len() != 1 {
        return Err(AgentError::protocol(format!(
            "action object must have exactly one key, found {}",
            object.len()
        )));
    }
    let (name, args_value) = object.iter().next().expect("length checked above");
    let spec = lookup(name)
        .ok_or_else(|| AgentError::protocol(format!("unknown action: {name}")))?;

    let empty = Args::new();
    let args = match args_value {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(AgentError::protocol(format!(
                "{name}: parameters must be an object, found {other}"
            )))
        }
    };

    spec.build(args).map_err(|err| match err {
        AgentError::Protocol(message) => AgentError::protocol(format!("{name}: {message}")),
        other => other,
    })
}

/// Parse a list of proposed actions in order.
pub fn parse_actions(values: &[Value]) -> Result<Vec<AgentAction>, AgentError> {
    values.iter().map(parse_action).collect()
}

/// Render the `<action>` catalog embedded in the system prompt.
pub fn render_catalog() -> String {
    let mut out = String::new();
    for spec in REGISTRY {
        out.push_str("<action>\n");
        out.push_str(&format!("  <name>{}</name>\n", spec.name));
        out.push_str(&format!("  <description>{}</description>\n", spec.description));
        out.push_str("  <parameters>\n");
        for param in spec.params {
            out.push_str(&format!(
                "    <param><name>{}</name><type>{}</type><description>{}</description></param>\n",
                param.name,
                param.kind.as_str(),
                param.description
            ));
        }
        out.push_str("  </parameters>\n");
        out.push_str("</action>\n");
    }
    out
}

fn coerce_int(value: &Value, name: &str) -> Result<i64, AgentError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| AgentError::protocol(format!("parameter {name} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| AgentError::protocol(format!("parameter {name} is not an integer"))),
        _ => Err(AgentError::protocol(format!(
            "parameter {name} must be an integer"
        ))),
    }
}

fn coerce_string(value: &Value, name: &str) -> Result<String, AgentError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(AgentError::protocol(format!(
            "parameter {name} must be a string"
        ))),
    }
}

fn opt_i32(args: &Args, name: &str) -> Result<Option<i32>, AgentError> {
    args.get(name)
        .map(|v| {
            coerce_int(v, name).and_then(|i| {
                i32::try_from(i)
                    .map_err(|_| AgentError::protocol(format!("parameter {name} out of range")))
            })
        })
        .transpose()
}

fn opt_u32(args: &Args, name: &str) -> Result<Option<u32>, AgentError> {
    args.get(name)
        .map(|v| {
            coerce_int(v, name).and_then(|i| {
                u32::try_from(i).map_err(|_| {
                    AgentError::protocol(format!("parameter {name} must be non-negative"))
                })
            })
        })
        .transpose()
}

fn req_u32(args: &Args, name: &str) -> Result<u32, AgentError> {
    opt_u32(args, name)?
        .ok_or_else(|| AgentError::protocol(format!("missing required parameter {name}")))
}

fn opt_string(args: &Args, name: &str) -> Result<Option<String>, AgentError> {
    args.get(name).map(|v| coerce_string(v, name)).transpose()
}

fn req_string(args: &Args, name: &str) -> Result<String, AgentError> {
    opt_string(args, name)?
        .ok_or_else(|| AgentError::protocol(format!("missing required parameter {name}")))
}

fn opt_bool(args: &Args, name: &str) -> Result<Option<bool>, AgentError> {
    args.get(name)
        .map(|v| match v {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(AgentError::protocol(format!(
                    "parameter {name} must be a boolean"
                ))),
            },
            _ => Err(AgentError::protocol(format!(
                "parameter {name} must be a boolean"
            ))),
        })
        .transpose()
}

fn opt_string_list(args: &Args, name: &str) -> Result<Vec<String>, AgentError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(|v| coerce_string(v, name)).collect(),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(_) => Err(AgentError::protocol(format!(
            "parameter {name} must be a list of strings"
        ))),
    }
}

fn opt_string_map(args: &Args, name: &str) -> Result<HashMap<String, String>, AgentError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(HashMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| coerce_string(v, name).map(|s| (k.clone(), s)))
            .collect(),
        Some(_) => Err(AgentError::protocol(format!(
            "parameter {name} must be a map of strings"
        ))),
    }
}
