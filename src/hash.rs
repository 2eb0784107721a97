use crate::{Error, Result};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, instrument};

const READ_BLOCK: usize = 64 * 1024;

/// Available checksum types, each holding the expected hex digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hash {
    /// Sha224 sum
    SHA224(String),
    /// Sha256 sum
    SHA256(String),
    /// Sha384 sum
    SHA384(String),
    /// Sha512 sum
    SHA512(String),
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SHA224(val) | Self::SHA256(val) | Self::SHA384(val) | Self::SHA512(val) => {
                write!(f, "{}", val)
            }
        }
    }
}

impl Hash {
    pub fn new_sha256(sum: impl Into<String>) -> Self {
        Self::SHA256(sum.into())
    }

    /// Compare the sum of `data` with the expected one,
    /// the error carries the sum that was computed
    ///
    /// # Example
    ///
    /// ```
    /// use multiget::Hash;
    /// let hash = Hash::new_sha256("039058c6f2c0cb492c533b0a4d14ef77cc0f78abccced5287d84a1a2011cfb81");
    /// assert!(hash.verify(&[1, 2, 3]).is_ok());
    /// ```
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let computed = match self {
            Self::SHA224(_) => hex(Sha224::digest(data)),
            Self::SHA256(_) => hex(Sha256::digest(data)),
            Self::SHA384(_) => hex(Sha384::digest(data)),
            Self::SHA512(_) => hex(Sha512::digest(data)),
        };
        self.compare(computed)
    }

    /// Verify the contents of a file on disk, read block by block
    #[instrument(skip(self), fields(sum = %self))]
    pub async fn verify_file(&self, path: &Path) -> Result<()> {
        let computed = match self {
            Self::SHA224(_) => digest_file::<Sha224>(path).await?,
            Self::SHA256(_) => digest_file::<Sha256>(path).await?,
            Self::SHA384(_) => digest_file::<Sha384>(path).await?,
            Self::SHA512(_) => digest_file::<Sha512>(path).await?,
        };
        self.compare(computed)
    }

    fn compare(&self, computed: String) -> Result<()> {
        let expected = self.to_string().to_lowercase();
        debug!("Comparing sum {}", expected);
        debug!("Computed sum: {}", computed);
        if computed == expected {
            debug!("Checksum match!");
            Ok(())
        } else {
            Err(Error::SHAMismatch(computed))
        }
    }
}

fn hex(digest: impl AsRef<[u8]>) -> String {
    digest.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}

async fn digest_file<D: Digest>(path: &Path) -> Result<String> {
    let mut reader = BufReader::with_capacity(READ_BLOCK, tokio::fs::File::open(path).await?);
    let mut hasher = D::new();
    let mut block = vec![0u8; READ_BLOCK];
    loop {
        let n = reader.read(&mut block).await?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hex(hasher.finalize()))
}
