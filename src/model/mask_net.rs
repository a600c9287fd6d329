//! Learned per-frame mask network.
//!
//! A two-layer dense network maps each log-magnitude frame to a per-bin
//! sigmoid mask in (0, 1) that scales the linear magnitude. Parameters
//! are loaded once from a versioned little-endian blob exported by the
//! training side; after that the model is read-only and safe to share
//! across batch workers.
//!
//! Blob layout (all little-endian):
//!   magic "VXEN" | version u32 | endianness u8 | dtype u8
//!   bins u32 | hidden u32
//!   dense_1/kernel [bins x hidden] | dense_1/bias [hidden]
//!   dense_2/kernel [hidden x bins] | dense_2/bias [bins]

use crate::dsp::utils::MAG_EPS;
use crate::dsp::SpectralMap;
use crate::error::{EnhanceError, EnhanceResult};
use crate::model::EnhancementModel;
use anyhow::{anyhow, Context};
use log::info;
use std::convert::TryInto;
use std::io::{Cursor, Read};
use std::path::Path;

const MAGIC: [u8; 4] = *b"VXEN";
const VERSION: u32 = 1;
const ENDIANNESS_LITTLE: u8 = 0;
const DTYPE_F32: u8 = 0;

#[derive(Debug, Clone)]
pub struct MaskNet {
    bins: usize,
    hidden: usize,
    // Row-major: w1[i][j] weights input bin i to hidden unit j.
    w1: Vec<f32>,
    b1: Vec<f32>,
    w2: Vec<f32>,
    b2: Vec<f32>,
}

impl MaskNet {
    /// Load parameters from a blob file. The blob is opaque to callers;
    /// shape information lives in its header.
    pub fn load(path: &Path) -> EnhanceResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| EnhanceError::FileAccess {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let net = Self::from_bytes(&bytes)
            .map_err(|e| EnhanceError::ModelLoad(format!("{}: {:#}", path.display(), e)))?;
        info!(
            "loaded mask net from '{}' ({} bins, {} hidden units)",
            path.display(),
            net.bins,
            net.hidden
        );
        Ok(net)
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut cur = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic).context("reading magic")?;
        if magic != MAGIC {
            return Err(anyhow!("bad magic {:?}", magic));
        }
        let version = read_u32(&mut cur).context("reading version")?;
        if version != VERSION {
            return Err(anyhow!("unsupported version {}", version));
        }
        let mut flags = [0u8; 2];
        cur.read_exact(&mut flags).context("reading flags")?;
        if flags[0] != ENDIANNESS_LITTLE {
            return Err(anyhow!("unsupported endianness {}", flags[0]));
        }
        if flags[1] != DTYPE_F32 {
            return Err(anyhow!("unsupported dtype {}", flags[1]));
        }

        let bins = read_u32(&mut cur).context("reading bins")? as usize;
        let hidden = read_u32(&mut cur).context("reading hidden")? as usize;
        if bins == 0 || hidden == 0 {
            return Err(anyhow!("degenerate layer sizes {}x{}", bins, hidden));
        }

        let w1 = read_f32_vec(&mut cur, bins * hidden).context("reading dense_1/kernel")?;
        let b1 = read_f32_vec(&mut cur, hidden).context("reading dense_1/bias")?;
        let w2 = read_f32_vec(&mut cur, hidden * bins).context("reading dense_2/kernel")?;
        let b2 = read_f32_vec(&mut cur, bins).context("reading dense_2/bias")?;

        if cur.position() != bytes.len() as u64 {
            return Err(anyhow!(
                "{} trailing bytes after tensor data",
                bytes.len() as u64 - cur.position()
            ));
        }

        Ok(Self {
            bins,
            hidden,
            w1,
            b1,
            w2,
            b2,
        })
    }

    /// Serialize in the blob format above (the training exporter's
    /// contract; also used by tests).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.push(ENDIANNESS_LITTLE);
        out.push(DTYPE_F32);
        out.extend_from_slice(&(self.bins as u32).to_le_bytes());
        out.extend_from_slice(&(self.hidden as u32).to_le_bytes());
        for tensor in [&self.w1, &self.b1, &self.w2, &self.b2] {
            for v in tensor {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    pub fn from_parameters(
        bins: usize,
        hidden: usize,
        w1: Vec<f32>,
        b1: Vec<f32>,
        w2: Vec<f32>,
        b2: Vec<f32>,
    ) -> Self {
        assert_eq!(w1.len(), bins * hidden);
        assert_eq!(b1.len(), hidden);
        assert_eq!(w2.len(), hidden * bins);
        assert_eq!(b2.len(), bins);
        Self {
            bins,
            hidden,
            w1,
            b1,
            w2,
            b2,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Sigmoid mask for one log-magnitude frame.
    fn mask(&self, frame: &[f32]) -> Vec<f32> {
        let mut h = self.b1.clone();
        for (i, &x) in frame.iter().enumerate() {
            let row = &self.w1[i * self.hidden..(i + 1) * self.hidden];
            for (j, &w) in row.iter().enumerate() {
                h[j] += w * x;
            }
        }
        for v in h.iter_mut() {
            *v = v.max(0.0); // ReLU
        }

        let mut out = self.b2.clone();
        for (j, &a) in h.iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            let row = &self.w2[j * self.bins..(j + 1) * self.bins];
            for (i, &w) in row.iter().enumerate() {
                out[i] += w * a;
            }
        }
        for v in out.iter_mut() {
            *v = 1.0 / (1.0 + (-*v).exp());
        }
        out
    }
}

impl EnhancementModel for MaskNet {
    fn name(&self) -> &str {
        "mask_net"
    }

    fn enhance(&self, log_mag: &SpectralMap) -> EnhanceResult<SpectralMap> {
        if log_mag.bins() != self.bins {
            return Err(EnhanceError::ShapeUnsupported {
                model: self.name().to_string(),
                frames: log_mag.frames(),
                bins: log_mag.bins(),
                reason: format!("network was trained for {} bins", self.bins),
            });
        }

        let mut out = SpectralMap::zeros(log_mag.frames(), log_mag.bins());
        for t in 0..log_mag.frames() {
            let frame = log_mag.row(t);
            let mask = self.mask(frame);
            let out_row = out.row_mut(t);
            for i in 0..frame.len() {
                let lin = (frame[i].exp() - MAG_EPS).max(0.0);
                out_row[i] = (mask[i] * lin + MAG_EPS).ln();
            }
        }
        Ok(out)
    }
}

fn read_u32(cur: &mut Cursor<&[u8]>) -> anyhow::Result<u32> {
    let mut buf = [0u8; 4];
    cur.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32_vec(cur: &mut Cursor<&[u8]>, len: usize) -> anyhow::Result<Vec<f32>> {
    let mut buf = vec![0u8; len * 4];
    cur.read_exact(&mut buf)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().expect("chunk of 4")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_net(bins: usize) -> MaskNet {
        let hidden = 4;
        let w1 = (0..bins * hidden).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect();
        let b1 = vec![0.05; hidden];
        let w2 = (0..hidden * bins).map(|i| ((i % 5) as f32 - 2.0) * 0.1).collect();
        let b2 = vec![0.5; bins];
        MaskNet::from_parameters(bins, hidden, w1, b1, w2, b2)
    }

    #[test]
    fn blob_round_trip() {
        let net = tiny_net(9);
        let loaded = MaskNet::from_bytes(&net.to_bytes()).unwrap();
        assert_eq!(loaded.bins(), 9);
        let input = SpectralMap::new(3, 9, vec![-2.0; 27]);
        assert_eq!(net.enhance(&input).unwrap(), loaded.enhance(&input).unwrap());
    }

    #[test]
    fn load_from_disk() {
        let net = tiny_net(5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask_net_v1.bin");
        std::fs::write(&path, net.to_bytes()).unwrap();
        let loaded = MaskNet::load(&path).unwrap();
        assert_eq!(loaded.bins(), 5);
    }

    #[test]
    fn rejects_corrupt_blob() {
        let mut bytes = tiny_net(5).to_bytes();
        bytes[0] = b'X'; // break the magic
        assert!(MaskNet::from_bytes(&bytes).is_err());

        let net = tiny_net(5);
        let mut truncated = net.to_bytes();
        truncated.truncate(truncated.len() - 3);
        assert!(MaskNet::from_bytes(&truncated).is_err());
    }

    #[test]
    fn wrong_bin_count_is_shape_unsupported() {
        let net = tiny_net(9);
        let input = SpectralMap::zeros(4, 17);
        let err = net.enhance(&input).unwrap_err();
        assert_eq!(err.kind(), "ShapeUnsupported");
    }

    #[test]
    fn output_never_exceeds_input_magnitude() {
        // Sigmoid masks are < 1, so the net can only attenuate.
        let net = tiny_net(9);
        let input = SpectralMap::new(2, 9, (0..18).map(|i| -3.0 + 0.3 * i as f32).collect());
        let out = net.enhance(&input).unwrap();
        for (o, i) in out.data().iter().zip(input.data()) {
            assert!(o <= &(i + 1e-6));
        }
    }
}
