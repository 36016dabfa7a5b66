use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{NetError, NetResult};
use crate::spec::parser::parse_block_spec;

/// Topology and run-time limits of an interpolation network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Per-level channel counts, finest first.
    #[serde(default = "default_channels")]
    pub channels: Vec<usize>,
    #[serde(default = "default_horizontal")]
    pub encoder_horizontal: String,
    #[serde(default = "default_encoder_vertical")]
    pub encoder_vertical: String,
    #[serde(default = "default_horizontal")]
    pub decoder_horizontal: String,
    #[serde(default = "default_decoder_vertical")]
    pub decoder_vertical: String,
    /// Block producing one set of 1-D synthesis kernels from the decoder output.
    #[serde(default = "default_head")]
    pub head: String,
    /// Length of each 1-D synthesis kernel. Must be odd.
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_max_width")]
    pub max_width: usize,
    #[serde(default = "default_max_height")]
    pub max_height: usize,
    /// Worker threads for data-parallel kernels; `None` uses rayon's global pool.
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_channels() -> Vec<usize> {
    vec![32, 64, 128, 256, 512]
}

fn default_horizontal() -> String {
    "prelu(0.25)-conv(3)-prelu(0.25)-conv(3)+skip".to_owned()
}

fn default_encoder_vertical() -> String {
    "prelu(0.25)-sconv(3)-prelu(0.25)-conv(3)".to_owned()
}

fn default_decoder_vertical() -> String {
    "prelu(0.25)-up(bilinear)-conv(3)-prelu(0.25)-conv(3)".to_owned()
}

fn default_head() -> String {
    "up(bilinear)-conv(3)-prelu(0.25)-conv(3)".to_owned()
}

fn default_kernel_size() -> usize {
    51
}

fn default_max_width() -> usize {
    1280
}

fn default_max_height() -> usize {
    720
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            encoder_horizontal: default_horizontal(),
            encoder_vertical: default_encoder_vertical(),
            decoder_horizontal: default_horizontal(),
            decoder_vertical: default_decoder_vertical(),
            head: default_head(),
            kernel_size: default_kernel_size(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            threads: None,
        }
    }
}

impl NetworkConfig {
    /// Parse a config from JSON text. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> NetResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| NetError::serde(format!("parse network config JSON: {e}")))
    }

    pub fn from_json_reader<R: std::io::Read>(r: R) -> NetResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| NetError::serde(format!("parse network config JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> NetResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            NetError::validation(format!("open network config '{}': {e}", path.display()))
        })?;
        Self::from_json_reader(BufReader::new(f))
    }

    /// Reject configurations no network can be built from.
    pub fn validate(&self) -> NetResult<()> {
        if self.channels.len() < 2 {
            return Err(NetError::validation(format!(
                "'channels' needs at least 2 levels, got {}",
                self.channels.len()
            )));
        }
        if let Some(level) = self.channels.iter().position(|&c| c == 0) {
            return Err(NetError::validation(format!(
                "'channels' entry {level} is zero"
            )));
        }
        if self.channels[0] % 2 != 0 {
            return Err(NetError::validation(format!(
                "'channels[0]' must be even to split across both input frames, got {}",
                self.channels[0]
            )));
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(NetError::validation(format!(
                "'kernel_size' must be odd, got {}",
                self.kernel_size
            )));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(NetError::validation("'max_width' and 'max_height' must be >= 1"));
        }
        if let Some(0) = self.threads {
            return Err(NetError::validation("'threads' must be >= 1 when set"));
        }
        for spec in [
            &self.encoder_horizontal,
            &self.encoder_vertical,
            &self.decoder_horizontal,
            &self.decoder_vertical,
            &self.head,
        ] {
            parse_block_spec(spec)?;
        }
        Ok(())
    }

    /// Channels produced by the shared input convolution for each frame.
    pub fn input_channels(&self) -> usize {
        self.channels[0] / 2
    }
}

/// Dedicated pool sized by `threads`, or rayon's default sizing when `None`.
pub fn build_thread_pool(threads: Option<usize>) -> NetResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(NetError::validation("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| NetError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/network/config.rs"]
mod tests;
