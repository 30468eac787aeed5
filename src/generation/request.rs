//! Command line construction for `tx3-bindgen`

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use crate::config::GenerationConfig;

/// A concrete generator invocation.
///
/// Always re-derived from a [`GenerationConfig`]; never edited after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    program: OsString,
    args: Vec<OsString>,
}

impl GenerationRequest {
    /// Flag order: inputs, output, target, endpoint, headers, env args, then
    /// user extras last so they can override anything before them.
    ///
    /// `inputs` is the input set resolved for this run, which may differ from
    /// the one captured when the config was built.
    pub fn from_config(config: &GenerationConfig, inputs: &[PathBuf]) -> Self {
        let mut args: Vec<OsString> = Vec::new();

        for input in inputs {
            args.push("-i".into());
            args.push(input.into());
        }

        args.push("-o".into());
        args.push(config.output_dir.as_os_str().to_owned());

        args.push("-t".into());
        args.push(config.target.as_str().into());

        args.push("--trp-endpoint".into());
        args.push(config.trp_endpoint.as_str().into());

        for (key, value) in &config.trp_headers {
            args.push("--trp-header".into());
            args.push(format!("{key}={value}").into());
        }

        for (key, value) in &config.env_args {
            args.push("--env-arg".into());
            args.push(format!("{key}={value}").into());
        }

        args.extend(config.bindgen_args.iter().map(OsString::from));

        Self {
            program: config.bindgen_path.as_str().into(),
            args,
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
