// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Content transcoder: the static dispatch table from an incoming MIME
//! type to the compiler that produces the compact over-the-air form.
//!
//! The compilers themselves (WML, SI) are external collaborators; this
//! module only owns the dispatch and the `no-transform` short-circuit.

use thiserror::Error;

/// A pure `bytes -> bytes` content compiler, e.g. the WML or SI compiler.
pub trait ContentCompiler: Send + Sync {
    fn compile(&self, body: &[u8]) -> Result<Vec<u8>, TranscodeError>;
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("push headers missing Content-Type")]
    MissingContentType,
    #[error("compiler for {0} failed: {1}")]
    CompilerFailed(String, String),
}

/// Result of a transcode attempt: either the content passed through
/// unchanged, or was replaced by a compiled artifact under a new MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Maps an input MIME type to `(compiled MIME type, compiler)`.
pub struct Transcoder {
    wml_compiler: Box<dyn ContentCompiler>,
    si_compiler: Box<dyn ContentCompiler>,
}

impl Transcoder {
    pub fn new(
        wml_compiler: Box<dyn ContentCompiler>,
        si_compiler: Box<dyn ContentCompiler>,
    ) -> Self {
        Self {
            wml_compiler,
            si_compiler,
        }
    }

    /// Applies the dispatch table. `content_type` and `body` are the
    /// push's current MIME type/body; `no_transform` mirrors a
    /// `Cache-Control: no-transform` header on the push.
    pub fn transform(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        no_transform: bool,
    ) -> Result<Transcoded, TranscodeError> {
        let content_type = content_type.ok_or(TranscodeError::MissingContentType)?;

        if no_transform {
            return Ok(Transcoded {
                content_type: content_type.to_string(),
                body: body.to_vec(),
            });
        }

        match content_type {
            "text/vnd.wap.wml" => {
                let compiled = self.wml_compiler.compile(body).map_err(|e| {
                    TranscodeError::CompilerFailed("text/vnd.wap.wml".into(), e.to_string())
                })?;
                Ok(Transcoded {
                    content_type: "application/vnd.wap.wmlc".to_string(),
                    body: compiled,
                })
            },
            "text/vnd.wap.si" => {
                let compiled = self.si_compiler.compile(body).map_err(|e| {
                    TranscodeError::CompilerFailed("text/vnd.wap.si".into(), e.to_string())
                })?;
                Ok(Transcoded {
                    content_type: "application/vnd.wap.sic".to_string(),
                    body: compiled,
                })
            },
            other => Ok(Transcoded {
                content_type: other.to_string(),
                body: body.to_vec(),
            }),
        }
    }
}
