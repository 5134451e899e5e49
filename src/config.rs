//! Runtime configuration

use clap::Parser;

use crate::signaling::DEFAULT_SIGNALING_PORT;

/// Two-party WebSocket signaling relay
#[derive(Debug, Clone, Parser)]
#[command(name = "tandem", version)]
pub struct RelayConfig {
    /// Port to listen on (all interfaces)
    #[arg(short, long, env = "TANDEM_PORT", default_value_t = DEFAULT_SIGNALING_PORT)]
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SIGNALING_PORT,
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 3004);
        assert_eq!(config.bind_addr(), "0.0.0.0:3004");
    }

    #[test]
    fn parse_port_flag() {
        let config = RelayConfig::try_parse_from(["tandem", "--port", "9000"]).unwrap();
        assert_eq!(config.port, 9000);

        let config = RelayConfig::try_parse_from(["tandem", "-p", "9001"]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9001");
    }

    #[test]
    fn reject_invalid_port() {
        assert!(RelayConfig::try_parse_from(["tandem", "--port", "70000"]).is_err());
        assert!(RelayConfig::try_parse_from(["tandem", "--port", "abc"]).is_err());
    }

    #[test]
    fn reject_unknown_flags() {
        assert!(RelayConfig::try_parse_from(["tandem", "--host", "x"]).is_err());
    }
}
