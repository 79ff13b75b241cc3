// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FOM bindings: objects, attributes, interactions and parameters mapped
//! onto executive variables.

pub mod attribute;
pub mod interaction;
pub mod manager;
pub mod object;

pub use attribute::Attribute;
pub use interaction::{Interaction, Parameter};
pub use manager::FomManager;
pub use object::Object;

use crate::codec::CodecError;
use crate::error::{Error, Result};

/// Report a codec failure on one binding.
///
/// Fatal failures are returned; everything else is logged and the update
/// is skipped.
pub(crate) fn codec_failure(
    fom_name: &str,
    var_name: &str,
    operation: &str,
    source: CodecError,
) -> Result<()> {
    if source.is_fatal() {
        log::error!(
            "[codec] {} of '{}' (variable '{}') failed: {}",
            operation,
            fom_name,
            var_name,
            source
        );
        return Err(Error::Codec {
            fom_name: fom_name.to_string(),
            source,
        });
    }
    log::warn!(
        "[codec] {} of '{}' (variable '{}') skipped: {}",
        operation,
        fom_name,
        var_name,
        source
    );
    Ok(())
}
