//! Named commands accepted by `do_command` and how they map onto the camera.

use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

use crate::device::http::{FOCUS_SPEED, MOVE_SPEED, PRESET_SPEED, ZOOM_SPEED};
use crate::device::{DeviceResult, PtzOp, PtzPreset, ReolinkApi, ZoomFocusOp};

pub const NON_MAP_ARGUMENT: &str = "non-map argument provided, ignored";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
    RightUp,
    RightDown,
    LeftUp,
    LeftDown,
}

impl Direction {
    fn op(self) -> PtzOp {
        match self {
            Direction::Right => PtzOp::Right,
            Direction::Left => PtzOp::Left,
            Direction::Up => PtzOp::Up,
            Direction::Down => PtzOp::Down,
            Direction::RightUp => PtzOp::RightUp,
            Direction::RightDown => PtzOp::RightDown,
            Direction::LeftUp => PtzOp::LeftUp,
            Direction::LeftDown => PtzOp::LeftDown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraCommand {
    Move(Direction),
    Stop,
    AutoMovement,
    StartZoomIn,
    StartZoomOut,
    StopZoom,
    StartFocusIn,
    StartFocusOut,
    StopFocus,
    SetZoomPosition { position: i64 },
    SetFocusPosition { position: i64 },
    GetAutoFocus,
    SetAutoFocus { disable: bool },
    GoToPreset { id: i64 },
    AddPreset { id: i64, name: String },
    RemovePreset { id: i64, name: String },
    ListPresets,
    GetCalibrationState,
    PerformCalibration,
}

/// Why a single request entry could not be turned into a [`CameraCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown(String),
    MissingArgument(&'static str),
    InvalidArgument { name: &'static str, expected: &'static str, got: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unknown(name) => write!(f, "unknown command: {}", name),
            ParseError::MissingArgument(name) => write!(f, "missing required argument '{}'", name),
            ParseError::InvalidArgument { name, expected, got } => {
                write!(f, "argument '{}' must be {}, got {}", name, expected, got)
            }
        }
    }
}

impl CameraCommand {
    pub fn parse(name: &str, args: &Map<String, Value>) -> Result<Self, ParseError> {
        let command = match name {
            "ptz_move_right" => CameraCommand::Move(Direction::Right),
            "ptz_move_left" => CameraCommand::Move(Direction::Left),
            "ptz_move_up" => CameraCommand::Move(Direction::Up),
            "ptz_move_down" => CameraCommand::Move(Direction::Down),
            "ptz_move_right_up" => CameraCommand::Move(Direction::RightUp),
            "ptz_move_right_down" => CameraCommand::Move(Direction::RightDown),
            "ptz_move_left_up" => CameraCommand::Move(Direction::LeftUp),
            "ptz_move_left_down" => CameraCommand::Move(Direction::LeftDown),
            "ptz_stop" => CameraCommand::Stop,
            "ptz_auto_movement" => CameraCommand::AutoMovement,

            "ptz_start_zooming_in" => CameraCommand::StartZoomIn,
            "ptz_start_zooming_out" => CameraCommand::StartZoomOut,
            "ptz_stop_zooming" => CameraCommand::StopZoom,
            "ptz_start_focusing_in" => CameraCommand::StartFocusIn,
            "ptz_start_focusing_out" => CameraCommand::StartFocusOut,
            "ptz_stop_focusing" => CameraCommand::StopFocus,
            "ptz_set_zoom_position" => CameraCommand::SetZoomPosition {
                position: int_arg(args, "position")?,
            },
            "ptz_set_focus_position" => CameraCommand::SetFocusPosition {
                position: int_arg(args, "position")?,
            },

            "get_auto_focus" => CameraCommand::GetAutoFocus,
            "set_auto_focus" => CameraCommand::SetAutoFocus {
                disable: bool_arg(args, "disable")?,
            },

            "ptz_go_to_preset" => CameraCommand::GoToPreset { id: int_arg(args, "id")? },
            "ptz_add_preset" => CameraCommand::AddPreset {
                id: int_arg(args, "id")?,
                name: string_arg(args, "name")?,
            },
            "ptz_remove_preset" => CameraCommand::RemovePreset {
                id: int_arg(args, "id")?,
                name: string_arg(args, "name")?,
            },
            "ptz_get_presets" => CameraCommand::ListPresets,
            "ptz_get_check_state" => CameraCommand::GetCalibrationState,
            "ptz_perform_calibration" => CameraCommand::PerformCalibration,

            _ => return Err(ParseError::Unknown(name.to_string())),
        };

        Ok(command)
    }

    /// Runs the command against the camera. `settle` is how long a preset
    /// recall waits before returning.
    pub async fn execute(&self, api: &dyn ReolinkApi, settle: Duration) -> DeviceResult<Value> {
        match self {
            CameraCommand::Move(direction) => api.ptz_ctrl(direction.op(), Some(MOVE_SPEED), None).await,
            CameraCommand::Stop => api.ptz_ctrl(PtzOp::Stop, None, None).await,
            CameraCommand::AutoMovement => api.ptz_ctrl(PtzOp::Auto, Some(MOVE_SPEED), None).await,

            CameraCommand::StartZoomIn => api.ptz_ctrl(PtzOp::ZoomInc, Some(ZOOM_SPEED), None).await,
            CameraCommand::StartZoomOut => api.ptz_ctrl(PtzOp::ZoomDec, Some(ZOOM_SPEED), None).await,
            CameraCommand::StartFocusIn => api.ptz_ctrl(PtzOp::FocusInc, Some(FOCUS_SPEED), None).await,
            CameraCommand::StartFocusOut => api.ptz_ctrl(PtzOp::FocusDec, Some(FOCUS_SPEED), None).await,
            CameraCommand::StopZoom | CameraCommand::StopFocus => api.ptz_ctrl(PtzOp::Stop, None, None).await,
            CameraCommand::SetZoomPosition { position } => {
                api.start_zoom_focus(ZoomFocusOp::ZoomPos, *position).await
            }
            CameraCommand::SetFocusPosition { position } => {
                api.start_zoom_focus(ZoomFocusOp::FocusPos, *position).await
            }

            CameraCommand::GetAutoFocus => api.get_auto_focus().await,
            CameraCommand::SetAutoFocus { disable } => api.set_auto_focus(*disable).await,

            CameraCommand::GoToPreset { id } => {
                let result = api.ptz_ctrl(PtzOp::ToPos, Some(PRESET_SPEED), Some(*id)).await?;
                // The call returns as soon as the camera accepts it, not when it arrives
                tokio::time::sleep(settle).await;
                Ok(result)
            }
            CameraCommand::AddPreset { id, name } => {
                api.set_ptz_preset(PtzPreset { id: *id, name: name.clone(), enable: true }).await
            }
            CameraCommand::RemovePreset { id, name } => {
                api.set_ptz_preset(PtzPreset { id: *id, name: name.clone(), enable: false }).await
            }
            CameraCommand::ListPresets => api.get_ptz_presets().await,
            CameraCommand::GetCalibrationState => api.get_ptz_check_state().await,
            CameraCommand::PerformCalibration => api.ptz_check().await,
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

// Structs coming over the framework wire carry every number as a double, so
// integral floats and numeric strings are accepted too.
fn int_arg(args: &Map<String, Value>, name: &'static str) -> Result<i64, ParseError> {
    let value = args.get(name).ok_or(ParseError::MissingArgument(name))?;
    let invalid = || ParseError::InvalidArgument {
        name,
        expected: "an integer",
        got: describe(value),
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(invalid()),
                }
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn bool_arg(args: &Map<String, Value>, name: &'static str) -> Result<bool, ParseError> {
    let value = args.get(name).ok_or(ParseError::MissingArgument(name))?;
    let invalid = || ParseError::InvalidArgument {
        name,
        expected: "a boolean",
        got: describe(value),
    };

    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(false),
            Some(f) if f == 1.0 => Ok(true),
            _ => Err(invalid()),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

fn string_arg(args: &Map<String, Value>, name: &'static str) -> Result<String, ParseError> {
    match args.get(name) {
        None => Err(ParseError::MissingArgument(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(ParseError::InvalidArgument {
            name,
            expected: "a string",
            got: describe(other),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Success(Value),
    Failure(String),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            CommandOutcome::Success(value) => json!({ "result": value }),
            CommandOutcome::Failure(message) => json!({ "error": message }),
        }
    }
}

/// Per-command results in the order the commands were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandResults {
    entries: Vec<(String, CommandOutcome)>,
}

impl CommandResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, outcome: CommandOutcome) {
        self.entries.push((name.into(), outcome));
    }

    pub fn get(&self, name: &str) -> Option<&CommandOutcome> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandOutcome)> {
        self.entries.iter().map(|(n, o)| (n.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_json(self) -> Map<String, Value> {
        self.entries
            .into_iter()
            .map(|(name, outcome)| (name, outcome.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_argumentless_commands() {
        let empty = Map::new();

        assert_eq!(
            CameraCommand::parse("ptz_move_left", &empty).unwrap(),
            CameraCommand::Move(Direction::Left)
        );
        assert_eq!(
            CameraCommand::parse("ptz_move_right_down", &empty).unwrap(),
            CameraCommand::Move(Direction::RightDown)
        );
        assert_eq!(CameraCommand::parse("ptz_stop_zooming", &empty).unwrap(), CameraCommand::StopZoom);
        assert_eq!(
            CameraCommand::parse("ptz_get_check_state", &empty).unwrap(),
            CameraCommand::GetCalibrationState
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = CameraCommand::parse("bogus_cmd", &Map::new()).unwrap_err();

        assert_eq!(err, ParseError::Unknown("bogus_cmd".to_string()));
        assert_eq!(err.to_string(), "unknown command: bogus_cmd");
    }

    #[test]
    fn test_integer_coercion() {
        for value in [json!(3), json!(3.0), json!("3")] {
            let command = CameraCommand::parse("ptz_go_to_preset", &args(json!({ "id": value }))).unwrap();
            assert_eq!(command, CameraCommand::GoToPreset { id: 3 });
        }

        let err = CameraCommand::parse("ptz_go_to_preset", &args(json!({ "id": 2.5 }))).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { name: "id", .. }));

        let err = CameraCommand::parse("ptz_go_to_preset", &args(json!({ "id": 9223372036854775808.0 }))).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { name: "id", .. }));

        let err = CameraCommand::parse("ptz_set_zoom_position", &args(json!({ "position": "far" }))).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { name: "position", .. }));
    }

    #[test]
    fn test_boolean_coercion() {
        let cases = [
            (json!(true), true),
            (json!(false), false),
            (json!(1), true),
            (json!(0.0), false),
            (json!("TRUE"), true),
        ];
        for (value, expected) in cases {
            let command = CameraCommand::parse("set_auto_focus", &args(json!({ "disable": value }))).unwrap();
            assert_eq!(command, CameraCommand::SetAutoFocus { disable: expected });
        }

        let err = CameraCommand::parse("set_auto_focus", &args(json!({ "disable": "maybe" }))).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { name: "disable", .. }));
    }

    #[test]
    fn test_missing_argument() {
        let err = CameraCommand::parse("ptz_add_preset", &args(json!({ "id": 1 }))).unwrap_err();

        assert_eq!(err, ParseError::MissingArgument("name"));
        assert_eq!(err.to_string(), "missing required argument 'name'");
    }

    #[test]
    fn test_results_keep_request_order() {
        let mut results = CommandResults::new();
        results.push("ptz_stop", CommandOutcome::Success(json!([{ "code": 0 }])));
        results.push("bogus", CommandOutcome::Failure("unknown command: bogus".to_string()));
        results.push("ptz_move_up", CommandOutcome::Success(json!(null)));

        assert_eq!(results.names().collect::<Vec<_>>(), vec!["ptz_stop", "bogus", "ptz_move_up"]);

        let json = results.into_json();
        assert_eq!(json.keys().cloned().collect::<Vec<_>>(), vec!["ptz_stop", "bogus", "ptz_move_up"]);
        assert_eq!(json["bogus"], json!({ "error": "unknown command: bogus" }));
        assert_eq!(json["ptz_stop"], json!({ "result": [{ "code": 0 }] }));
    }
}
