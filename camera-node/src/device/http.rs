use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::protocol::{check_response, parse_login_token, ApiRequest};
use super::{
    CapturedFrame, DeviceConnector, DeviceError, DeviceResult, PtzOp, PtzPreset, ReolinkApi,
    ZoomFocusOp,
};
use crate::config::ReolinkConfig;

/// Reolink's default motor speeds for each kind of PTZ movement.
pub const MOVE_SPEED: u32 = 25;
pub const ZOOM_SPEED: u32 = 60;
pub const FOCUS_SPEED: u32 = 32;
pub const PRESET_SPEED: u32 = 60;

pub struct HttpReolinkClient {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    channel: u8,
    token: RwLock<Option<String>>,
}

impl HttpReolinkClient {
    pub fn new(config: &ReolinkConfig) -> DeviceResult<Self> {
        // Reolink firmware ships self-signed certificates
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.https)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}://{}/cgi-bin/api.cgi", config.scheme(), config.host),
            username: config.username.clone(),
            password: config.password.clone(),
            channel: config.channel,
            token: RwLock::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn token(&self) -> DeviceResult<String> {
        self.token.read().await.clone().ok_or(DeviceError::NotLoggedIn)
    }

    async fn post(&self, request: ApiRequest, token: &str) -> DeviceResult<Value> {
        debug!("POST {} cmd={}", self.endpoint, request.cmd);

        let body: Value = self
            .http
            .post(&self.endpoint)
            .query(&[("cmd", request.cmd), ("token", token)])
            .json(&[&request])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_response(request.cmd, &body)?;
        Ok(body)
    }

    async fn execute(&self, request: ApiRequest) -> DeviceResult<Value> {
        let token = self.token().await?;
        self.post(request, &token).await
    }
}

#[async_trait]
impl ReolinkApi for HttpReolinkClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn login(&self) -> DeviceResult<()> {
        let request = ApiRequest::login(&self.username, &self.password);
        let body: Value = self
            .http
            .post(&self.endpoint)
            .query(&[("cmd", "Login"), ("token", "null")])
            .json(&[&request])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let token = parse_login_token(&body)?;
        *self.token.write().await = Some(token);

        info!("Logged in to Reolink camera as {}", self.username);
        Ok(())
    }

    async fn logout(&self) -> DeviceResult<()> {
        let token = match self.token.write().await.take() {
            Some(token) => token,
            None => return Ok(()),
        };

        self.post(ApiRequest::logout(), &token).await?;
        info!("Logged out of Reolink camera");
        Ok(())
    }

    async fn snapshot(&self) -> DeviceResult<CapturedFrame> {
        let token = self.token().await?;
        let rs = uuid::Uuid::new_v4().simple().to_string();
        let channel = self.channel.to_string();

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("cmd", "Snap"),
                ("channel", channel.as_str()),
                ("rs", rs.as_str()),
                ("token", token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json") || v.starts_with("text/"))
            .unwrap_or(false);

        let bytes = response.bytes().await?;

        if is_json {
            // The camera answers a refused snapshot with an error envelope
            let body: Value = serde_json::from_slice(&bytes)?;
            check_response("Snap", &body)?;
            return Err(DeviceError::UnexpectedResponse(
                "snapshot returned JSON instead of an image".to_string(),
            ));
        }

        CapturedFrame::decode(bytes.to_vec())
    }

    async fn ptz_ctrl(&self, op: PtzOp, speed: Option<u32>, preset_id: Option<i64>) -> DeviceResult<Value> {
        self.execute(ApiRequest::ptz_ctrl(self.channel, op, speed, preset_id)).await
    }

    async fn set_ptz_preset(&self, preset: PtzPreset) -> DeviceResult<Value> {
        self.execute(ApiRequest::set_ptz_preset(self.channel, &preset)).await
    }

    async fn get_ptz_presets(&self) -> DeviceResult<Value> {
        self.execute(ApiRequest::get_ptz_preset(self.channel)).await
    }

    async fn get_ptz_check_state(&self) -> DeviceResult<Value> {
        self.execute(ApiRequest::get_ptz_check_state(self.channel)).await
    }

    async fn ptz_check(&self) -> DeviceResult<Value> {
        self.execute(ApiRequest::ptz_check(self.channel)).await
    }

    async fn start_zoom_focus(&self, op: ZoomFocusOp, position: i64) -> DeviceResult<Value> {
        self.execute(ApiRequest::start_zoom_focus(self.channel, op, position)).await
    }

    async fn get_auto_focus(&self) -> DeviceResult<Value> {
        self.execute(ApiRequest::get_auto_focus(self.channel)).await
    }

    async fn set_auto_focus(&self, disable: bool) -> DeviceResult<Value> {
        self.execute(ApiRequest::set_auto_focus(self.channel, disable)).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl DeviceConnector for HttpConnector {
    fn connect(&self, config: &ReolinkConfig) -> DeviceResult<Arc<dyn ReolinkApi>> {
        Ok(Arc::new(HttpReolinkClient::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type Requests = Arc<Mutex<Vec<(String, String)>>>;

    /// Answers each request with `(content type, body)` picked from the
    /// request line.
    type Responder = fn(&str) -> (&'static str, Vec<u8>);

    fn login_reply() -> Vec<u8> {
        br#"[{"cmd":"Login","code":0,"value":{"Token":{"leaseTime":3600,"name":"tok42"}}}]"#.to_vec()
    }

    fn ok_reply(cmd: &str) -> Vec<u8> {
        format!(r#"[{{"cmd":"{}","code":0,"value":{{"rspCode":200}}}}]"#, cmd).into_bytes()
    }

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 3))
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn device(line: &str) -> (&'static str, Vec<u8>) {
        const JSON: &str = "application/json";

        if line.contains("cmd=Login") {
            (JSON, login_reply())
        } else if line.contains("cmd=Snap") {
            ("image/png", png_bytes())
        } else if line.contains("cmd=GetAutoFocus") {
            (
                JSON,
                br#"[{"cmd":"GetAutoFocus","code":1,"error":{"detail":"not support","rspCode":-9}}]"#.to_vec(),
            )
        } else if line.contains("cmd=Logout") {
            (JSON, ok_reply("Logout"))
        } else {
            (JSON, ok_reply("PtzCtrl"))
        }
    }

    fn refusing_device(line: &str) -> (&'static str, Vec<u8>) {
        if line.contains("cmd=Snap") {
            (
                "text/html",
                br#"[{"cmd":"Snap","code":1,"error":{"detail":"please login first","rspCode":-6}}]"#.to_vec(),
            )
        } else {
            device(line)
        }
    }

    async fn read_request(stream: &mut TcpStream) -> (String, String) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);

        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let line = head.lines().next().unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string();
        (line, body)
    }

    /// Local HTTP server standing in for the camera. Returns the `host:port`
    /// to configure and the requests it has seen.
    async fn fake_camera(respond: Responder) -> (String, Requests) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let (line, body) = read_request(&mut stream).await;
                let (content_type, reply) = respond(&line);
                seen.lock().unwrap().push((line, body));

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    content_type,
                    reply.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&reply).await;
                let _ = stream.shutdown().await;
            }
        });

        (addr.to_string(), requests)
    }

    fn local_config(host: String) -> ReolinkConfig {
        ReolinkConfig {
            host,
            ..config(false)
        }
    }

    fn config(https: bool) -> ReolinkConfig {
        ReolinkConfig {
            host: "192.168.1.20".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            https,
            debug: false,
            channel: 0,
        }
    }

    #[test]
    fn test_endpoint_follows_transport_flag() {
        let plain = HttpReolinkClient::new(&config(false)).unwrap();
        let secure = HttpReolinkClient::new(&config(true)).unwrap();

        assert_eq!(plain.endpoint(), "http://192.168.1.20/cgi-bin/api.cgi");
        assert_eq!(secure.endpoint(), "https://192.168.1.20/cgi-bin/api.cgi");
    }

    #[tokio::test]
    async fn test_commands_require_login() {
        let client = HttpReolinkClient::new(&config(false)).unwrap();

        let err = client.ptz_ctrl(PtzOp::Left, Some(MOVE_SPEED), None).await.unwrap_err();
        assert!(matches!(err, DeviceError::NotLoggedIn));

        let err = client.snapshot().await.unwrap_err();
        assert!(matches!(err, DeviceError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let client = HttpReolinkClient::new(&config(false)).unwrap();
        assert!(client.logout().await.is_ok());
    }

    #[tokio::test]
    async fn test_login_token_is_sent_with_commands() {
        let (host, requests) = fake_camera(device).await;
        let client = HttpReolinkClient::new(&local_config(host)).unwrap();

        client.login().await.unwrap();
        let value = client.ptz_ctrl(PtzOp::Left, Some(MOVE_SPEED), None).await.unwrap();

        assert_eq!(value[0]["code"], 0);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);

        let (login_line, login_body) = &requests[0];
        assert!(login_line.starts_with("POST /cgi-bin/api.cgi?cmd=Login&token=null"), "{}", login_line);
        let login: Value = serde_json::from_str(login_body).unwrap();
        assert_eq!(login[0]["param"]["User"]["userName"], "admin");
        assert_eq!(login[0]["param"]["User"]["password"], "secret");

        let (ptz_line, ptz_body) = &requests[1];
        assert!(ptz_line.starts_with("POST /cgi-bin/api.cgi?cmd=PtzCtrl&token=tok42"), "{}", ptz_line);
        let ptz: Value = serde_json::from_str(ptz_body).unwrap();
        assert_eq!(ptz[0]["param"]["op"], "Left");
        assert_eq!(ptz[0]["param"]["speed"], 25);
    }

    #[tokio::test]
    async fn test_device_error_reply_is_api_error() {
        let (host, _requests) = fake_camera(device).await;
        let client = HttpReolinkClient::new(&local_config(host)).unwrap();
        client.login().await.unwrap();

        match client.get_auto_focus().await.unwrap_err() {
            DeviceError::Api { cmd, code, detail } => {
                assert_eq!(cmd, "GetAutoFocus");
                assert_eq!(code, -9);
                assert_eq!(detail, "not support");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_snapshot_decodes_image() {
        let (host, requests) = fake_camera(device).await;
        let client = HttpReolinkClient::new(&local_config(host)).unwrap();
        client.login().await.unwrap();

        let frame = client.snapshot().await.unwrap();

        assert_eq!(frame.format, Some(image::ImageFormat::Png));
        assert_eq!((frame.image.width(), frame.image.height()), (4, 3));
        assert_eq!(frame.extension(), "png");

        let requests = requests.lock().unwrap();
        let (snap_line, _) = &requests[1];
        assert!(snap_line.starts_with("GET /cgi-bin/api.cgi?cmd=Snap&channel=0&rs="), "{}", snap_line);
        assert!(snap_line.contains("&token=tok42 "), "{}", snap_line);
    }

    #[tokio::test]
    async fn test_refused_snapshot_is_api_error() {
        let (host, _requests) = fake_camera(refusing_device).await;
        let client = HttpReolinkClient::new(&local_config(host)).unwrap();
        client.login().await.unwrap();

        match client.snapshot().await.unwrap_err() {
            DeviceError::Api { cmd, code, .. } => {
                assert_eq!(cmd, "Snap");
                assert_eq!(code, -6);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logout_releases_token() {
        let (host, requests) = fake_camera(device).await;
        let client = HttpReolinkClient::new(&local_config(host)).unwrap();
        client.login().await.unwrap();

        client.logout().await.unwrap();

        let err = client.ptz_ctrl(PtzOp::Stop, None, None).await.unwrap_err();
        assert!(matches!(err, DeviceError::NotLoggedIn));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].0.starts_with("POST /cgi-bin/api.cgi?cmd=Logout&token=tok42"), "{}", requests[1].0);
    }
}
