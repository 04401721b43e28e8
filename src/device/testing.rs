/// In-memory station used by the terminal and acquisition tests
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};

use crate::codec::{format_settings, parse_settings};
use crate::device::transport::Transport;
use crate::error::DeviceError;

pub const SAMPLE_REPLY: &str =
    "0R0,Dn=236D,Dm=283D,Dx=031D,Sn=0.0M,Sm=1.0M,Sx=2.2M,Ta=23.6C,Ua=14.2P,Pa=1026.6H,Rc=0.00M,Rd=0s,Ri=0.0M,Rp=0.0M,Th=25.9C";

pub struct FakeStation {
    pub written: Vec<String>,
    pub set_commands: usize,
    pub identify_reply: String,
    pub data_reply: String,
    pub stray_after_set: Option<String>,
    settings: BTreeMap<String, BTreeMap<String, String>>,
    outbox: VecDeque<String>,
}

impl FakeStation {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            set_commands: 0,
            identify_reply: "0".into(),
            data_reply: SAMPLE_REPLY.into(),
            stray_after_set: None,
            settings: BTreeMap::new(),
            outbox: VecDeque::new(),
        }
    }

    pub fn push_stray(&mut self, line: &str) {
        self.outbox.push_back(line.to_string());
    }

    pub fn set_current(&mut self, command: &str, values: &[(&str, &str)]) {
        let entry = self.settings.entry(command.to_string()).or_default();
        for (k, v) in values {
            entry.insert(k.to_string(), v.to_string());
        }
    }

    pub fn current(&self, command: &str) -> BTreeMap<String, String> {
        self.settings.get(command).cloned().unwrap_or_default()
    }

    pub fn is_drained(&self) -> bool {
        self.outbox.is_empty()
    }

    pub fn count(&self, command: &str) -> usize {
        self.written.iter().filter(|w| *w == command).count()
    }

    fn respond(&mut self, line: &str) {
        let reply = match line {
            "?" => Some("0".to_string()),
            "0" => Some(self.identify_reply.clone()),
            "0R0" => Some(self.data_reply.clone()).filter(|r| !r.is_empty()),
            "0XZRU" => Some("0TX,Rain reset".to_string()),
            "0XZRI" => Some("0TX,Inty reset".to_string()),
            _ => match parse_settings(line) {
                Ok((command, values)) if values.is_empty() => self
                    .settings
                    .get(&command)
                    .map(|current| format_settings(&command, current)),
                Ok((command, values)) => {
                    self.set_commands += 1;
                    self.settings.entry(command).or_default().extend(values);
                    Some(line.to_string())
                }
                Err(_) => None,
            },
        };

        if let Some(reply) = reply {
            self.outbox.push_back(reply);
        }
        if self.set_commands > 0 && line.contains('=') {
            if let Some(stray) = self.stray_after_set.take() {
                self.outbox.push_back(stray);
            }
        }
    }
}

#[async_trait]
impl Transport for FakeStation {
    fn name(&self) -> &str {
        "fake"
    }

    async fn write_line(&mut self, line: &str) -> Result<(), DeviceError> {
        self.written.push(line.to_string());
        self.respond(line);
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, DeviceError> {
        Ok(self.outbox.pop_front())
    }
}
