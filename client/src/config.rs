/// Which transport a client session talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Push,
    LongPoll,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the canvas server, e.g. `http://127.0.0.1:8000`.
    pub server_url: String,
    pub transport: TransportKind,
    /// Redraw rate cap for incoming updates.
    pub frames_per_second: u32,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            server_url: server_url.into(),
            transport,
            ..Self::default()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    pub fn ws_url(&self) -> String {
        let url = self.url("/ws");
        if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            url
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            transport: TransportKind::Push,
            frames_per_second: 40,
        }
    }
}
