//! JSON envelopes of `/cgi-bin/api.cgi`.
//!
//! Every call posts a one-element array of `{cmd, action, param}` and gets
//! back a one-element array of `{cmd, code, value | error}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{DeviceError, DeviceResult, PtzOp, PtzPreset, ZoomFocusOp};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ApiRequest {
    pub cmd: &'static str,
    pub action: u8,
    pub param: Value,
}

impl ApiRequest {
    fn new(cmd: &'static str, action: u8, param: Value) -> Self {
        Self { cmd, action, param }
    }

    pub fn login(username: &str, password: &str) -> Self {
        Self::new(
            "Login",
            0,
            json!({ "User": { "userName": username, "password": password } }),
        )
    }

    pub fn logout() -> Self {
        Self::new("Logout", 0, json!({}))
    }

    pub fn ptz_ctrl(channel: u8, op: PtzOp, speed: Option<u32>, preset_id: Option<i64>) -> Self {
        let mut param = json!({ "channel": channel, "op": op.as_str() });
        if let Some(speed) = speed {
            param["speed"] = json!(speed);
        }
        if let Some(id) = preset_id {
            param["id"] = json!(id);
        }
        Self::new("PtzCtrl", 0, param)
    }

    pub fn set_ptz_preset(channel: u8, preset: &PtzPreset) -> Self {
        Self::new(
            "SetPtzPreset",
            0,
            json!({
                "PtzPreset": {
                    "channel": channel,
                    "enable": u8::from(preset.enable),
                    "id": preset.id,
                    "name": preset.name,
                }
            }),
        )
    }

    pub fn get_ptz_preset(channel: u8) -> Self {
        Self::new("GetPtzPreset", 1, json!({ "channel": channel }))
    }

    pub fn get_ptz_check_state(channel: u8) -> Self {
        Self::new("GetPtzCheckState", 0, json!({ "channel": channel }))
    }

    pub fn ptz_check(channel: u8) -> Self {
        Self::new("PtzCheck", 0, json!({ "channel": channel }))
    }

    pub fn start_zoom_focus(channel: u8, op: ZoomFocusOp, position: i64) -> Self {
        Self::new(
            "StartZoomFocus",
            0,
            json!({ "ZoomFocus": { "channel": channel, "op": op.as_str(), "pos": position } }),
        )
    }

    pub fn get_auto_focus(channel: u8) -> Self {
        Self::new("GetAutoFocus", 0, json!({ "channel": channel }))
    }

    pub fn set_auto_focus(channel: u8, disable: bool) -> Self {
        Self::new(
            "SetAutoFocus",
            0,
            json!({ "AutoFocus": { "channel": channel, "disable": u8::from(disable) } }),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub cmd: String,
    pub code: i64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub rsp_code: i64,
    #[serde(default)]
    pub detail: String,
}

/// Fails if any entry of a response array reports an error.
pub fn check_response(cmd: &str, body: &Value) -> DeviceResult<()> {
    let responses: Vec<ApiResponse> = serde_json::from_value(body.clone())?;
    if responses.is_empty() {
        return Err(DeviceError::UnexpectedResponse(format!("empty response to {}", cmd)));
    }

    for response in responses {
        if let Some(error) = response.error {
            return Err(DeviceError::Api {
                cmd: response.cmd,
                code: error.rsp_code,
                detail: error.detail,
            });
        }
        if response.code != 0 {
            return Err(DeviceError::Api {
                cmd: response.cmd,
                code: response.code,
                detail: "non-zero response code".to_string(),
            });
        }
    }

    Ok(())
}

pub fn parse_login_token(body: &Value) -> DeviceResult<String> {
    check_response("Login", body)?;

    body.pointer("/0/value/Token/name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DeviceError::UnexpectedResponse("login response carries no token".to_string()))
}
