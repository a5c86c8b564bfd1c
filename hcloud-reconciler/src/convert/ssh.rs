//! SSH public key fingerprints.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};

use super::{ConvertError, Result};

/// MD5 fingerprint (`aa:bb:..`) of an OpenSSH public key line, the form the
/// provider indexes keys by.
pub fn fingerprint(public_key: &str) -> Result<String> {
    let mut fields = public_key.split_whitespace();
    let (Some(_algorithm), Some(body)) = (fields.next(), fields.next()) else {
        return Err(ConvertError::BadSshKey);
    };

    let blob = STANDARD
        .decode(body)
        .map_err(|e| ConvertError::SshKeyEncoding(e.to_string()))?;

    Ok(Md5::digest(&blob)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
