use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::{
    reference::RefError,
    report::{Domain, Message},
    service::{DocumentService, LoadError},
    tree::SchemaTree,
    util::*,
};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("$ref at {location} must be a string")]
    InvalidRef { location: String },
    #[error("invalid $ref {reference:?} at {location}")]
    InvalidUri {
        location: String,
        reference: String,
        #[source]
        src: RefError,
    },
    #[error("reference loop detected at {reference}")]
    Loop {
        reference: String,
        chain: Vec<String>,
    },
    #[error("dangling reference {reference}")]
    Dangling { reference: String },
    #[error("cannot load {reference}")]
    Load {
        reference: String,
        #[source]
        src: LoadError,
    },
}

impl ResolveError {
    pub(crate) fn domain(&self) -> Domain {
        match self {
            Self::Load { .. } => Domain::Loading,
            Self::InvalidRef { .. } | Self::InvalidUri { .. } => Domain::Syntax,
            Self::Loop { .. } | Self::Dangling { .. } => Domain::Resolution,
        }
    }

    /// adds details to a message reporting this error
    pub(crate) fn annotate(self, msg: Message) -> Message {
        match self {
            Self::Loop { chain, .. } => msg.arg("chain", chain),
            Self::Load { src, .. } => msg.arg("reason", src.to_string()),
            Self::InvalidUri { src, .. } => msg.arg("reason", src.to_string()),
            Self::Dangling { reference } => msg.arg("ref", reference),
            Self::InvalidRef { .. } => msg,
        }
    }
}

/// Follows `$ref` from the node of `tree` until a node without `$ref`.
///
/// Relative references resolve against the scope of the node holding
/// them. A reference is first looked up in the current document, then
/// loaded through `service`.
pub(crate) fn resolve(service: &DocumentService, tree: &SchemaTree) -> Result<SchemaTree, ResolveError> {
    let mut tree = tree.clone();
    let mut chain = vec![tree.current_ref()];
    let mut visited = HashSet::from([tree.current_ref()]);
    loop {
        let Some(r) = tree.current_node().get("$ref") else {
            return Ok(tree);
        };
        let Value::String(r) = r else {
            return Err(ResolveError::InvalidRef {
                location: tree.current_ref().to_string(),
            });
        };
        let target = tree
            .scope()
            .resolve(r)
            .map_err(|src| ResolveError::InvalidUri {
                location: tree.current_ref().to_string(),
                reference: r.clone(),
                src,
            })?;
        tracing::trace!(from = %tree.current_ref(), to = %target, "following $ref");

        let next = match tree.locate(&target) {
            Some(ptr) => tree.at(ptr).map_err(|_| ResolveError::Dangling {
                reference: target.to_string(),
            })?,
            None if target.same_document(tree.loading_ref()) => {
                return Err(ResolveError::Dangling {
                    reference: target.to_string(),
                })
            }
            None => match service.get_ref(&target) {
                Ok(next) => next,
                Err(LoadError::FragmentNotFound { .. }) => {
                    return Err(ResolveError::Dangling {
                        reference: target.to_string(),
                    })
                }
                Err(src) => {
                    return Err(ResolveError::Load {
                        reference: target.to_string(),
                        src,
                    })
                }
            },
        };

        let current = next.current_ref();
        chain.push(current.clone());
        if !visited.insert(current.clone()) {
            return Err(ResolveError::Loop {
                reference: current.to_string(),
                chain: chain.iter().map(ToString::to_string).collect(),
            });
        }
        tree = next;
    }
}
