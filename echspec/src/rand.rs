//! The single place where we generate random material for our own use.

use rand_core::{OsRng, RngCore};

use crate::error::Error;

/// Fill the whole slice with random material.
pub(crate) fn fill_random(bytes: &mut [u8]) -> Result<(), GetRandomFailed> {
    OsRng
        .try_fill_bytes(bytes)
        .map_err(|_| GetRandomFailed)
}

/// Make a [`Vec<u8>`] of the given size containing random material.
pub(crate) fn random_vec(len: usize) -> Result<Vec<u8>, GetRandomFailed> {
    let mut v = vec![0; len];
    fill_random(&mut v)?;
    Ok(v)
}

/// Return a uniformly random [`u8`].
pub(crate) fn random_u8() -> Result<u8, GetRandomFailed> {
    let mut buf = [0u8; 1];
    fill_random(&mut buf)?;
    Ok(buf[0])
}

/// Random material generation failed.
#[derive(Debug)]
pub struct GetRandomFailed;

impl From<GetRandomFailed> for Error {
    fn from(_: GetRandomFailed) -> Self {
        Self::FailedToGetRandomBytes
    }
}
