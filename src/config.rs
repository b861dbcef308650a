use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HELP: &str = "Flags:
    -e, --show-envs            Include local contexts in debug events
    -v, --verify               Re-typecheck and erase every elaborated definition
    -n, --full-norm            Unfold globals when normalizing
    -r, --allow-redefinition   Let a definition replace an existing global

Options:
    --instance-prefix <str>    Globals and locals starting with this are instance candidates
    --instance-depth <n>       How many nested instance arguments to search for
";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    ShowEnvs,
    Verify,
    FullNorm,
    AllowRedefinition,
}
impl Flag {
    pub fn short(c: char) -> Option<Self> {
        match c {
            'e' => Some(Flag::ShowEnvs),
            'v' => Some(Flag::Verify),
            'n' => Some(Flag::FullNorm),
            'r' => Some(Flag::AllowRedefinition),
            _ => None,
        }
    }
    pub fn long(s: &str) -> Option<Self> {
        match s {
            "show-envs" => Some(Flag::ShowEnvs),
            "verify" => Some(Flag::Verify),
            "full-norm" => Some(Flag::FullNorm),
            "allow-redefinition" => Some(Flag::AllowRedefinition),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized flag or option '{0}'")]
    Unrecognized(String),
    #[error("option '{0}' expects a value")]
    MissingValue(String),
    #[error("invalid value '{value}' for option '{opt}'")]
    BadValue { opt: String, value: String },
    #[error("malformed configuration: {0}")]
    Json(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub show_envs: bool,
    pub verify: bool,
    pub full_norm: bool,
    pub allow_redefinition: bool,
    pub instance_prefix: String,
    pub instance_depth: u32,
}
impl Default for Config {
    fn default() -> Self {
        Config {
            show_envs: false,
            verify: true,
            full_norm: false,
            allow_redefinition: false,
            instance_prefix: "inst".to_string(),
            instance_depth: 4,
        }
    }
}
impl Config {
    pub fn flag(&self, f: Flag) -> bool {
        match f {
            Flag::ShowEnvs => self.show_envs,
            Flag::Verify => self.verify,
            Flag::FullNorm => self.full_norm,
            Flag::AllowRedefinition => self.allow_redefinition,
        }
    }

    pub fn set_flag(&mut self, f: Flag, b: bool) {
        match f {
            Flag::ShowEnvs => self.show_envs = b,
            Flag::Verify => self.verify = b,
            Flag::FullNorm => self.full_norm = b,
            Flag::AllowRedefinition => self.allow_redefinition = b,
        }
    }

    /// Flips a flag, returning its new state
    pub fn toggle(&mut self, f: Flag) -> bool {
        let b = !self.flag(f);
        self.set_flag(f, b);
        b
    }

    pub fn from_json(s: &str) -> Result<Config, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        // A struct of plain fields always serializes
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    fn option(&mut self, opt: &str, val: String) -> Result<(), ConfigError> {
        match opt {
            "instance-prefix" => self.instance_prefix = val,
            "instance-depth" => {
                self.instance_depth = val.parse().map_err(|_| ConfigError::BadValue {
                    opt: opt.to_string(),
                    value: val,
                })?
            }
            _ => return Err(ConfigError::Unrecognized(opt.to_string())),
        }
        Ok(())
    }

    /// Applies command-line style flags on top of this configuration.
    /// Supports `-ev`, `--verify`, `--instance-depth=3` and `--instance-depth 3`.
    pub fn with_args<S: AsRef<str>>(
        mut self,
        args: impl IntoIterator<Item = S>,
    ) -> Result<Config, ConfigError> {
        let mut args = args.into_iter().map(|s| s.as_ref().to_string());
        while let Some(i) = args.next() {
            if let Some(long) = i.strip_prefix("--") {
                if let Some(flag) = Flag::long(long) {
                    self.set_flag(flag, true);
                } else if let Some(eq_idx) = long.find('=') {
                    let (opt, val) = long.split_at(eq_idx);
                    self.option(opt, val[1..].to_string())?;
                } else {
                    let val = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(long.to_string()))?;
                    self.option(long, val)?;
                }
            } else if let Some(short) = i.strip_prefix('-') {
                for c in short.chars() {
                    let flag = Flag::short(c)
                        .ok_or_else(|| ConfigError::Unrecognized(format!("-{}", c)))?;
                    self.set_flag(flag, true);
                }
            } else {
                return Err(ConfigError::Unrecognized(i));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults() {
        let config = Config::from_json(r#"{ "show-envs": true, "instance-depth": 2 }"#).unwrap();
        assert!(config.show_envs);
        assert!(config.verify);
        assert_eq!(config.instance_depth, 2);
        assert_eq!(config.instance_prefix, "inst");
        assert!(Config::from_json("{ \"verify\": 3 }").is_err());
    }

    #[test]
    fn args() {
        let config = Config::default()
            .with_args(["-er", "--instance-prefix", "i", "--instance-depth=7"])
            .unwrap();
        assert!(config.show_envs && config.allow_redefinition);
        assert_eq!(config.instance_prefix, "i");
        assert_eq!(config.instance_depth, 7);
        assert_eq!(
            Config::default().with_args(["-x"]),
            Err(ConfigError::Unrecognized("-x".into()))
        );
        assert!(Config::default().with_args(["--instance-depth"]).is_err());
    }

    #[test]
    fn toggle() {
        let mut config = Config::default();
        assert!(!config.toggle(Flag::Verify));
        assert!(config.toggle(Flag::Verify));
        assert_eq!(Config::from_json(&config.to_json()).unwrap(), config);
    }
}
