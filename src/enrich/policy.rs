//! Routing of citations to checker chains.

use std::fmt;
use std::sync::Arc;

use crate::config::PolicyConfig;
use crate::models::{Citation, Status};
use crate::sources::{mentions, CheckerRegistry, StatusChecker};

/// Errors building a [`ResolutionPolicy`] from configuration
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Unknown checker '{id}' in {context}")]
    UnknownChecker { id: String, context: String },

    #[error("Empty checker chain in {context}")]
    EmptyChain { context: String },
}

/// Ordered checkers, run until one answers something other than not found
pub type Chain = Vec<Arc<dyn StatusChecker>>;

/// A document-type pattern and the chain it selects
#[derive(Debug, Clone)]
pub struct Route {
    /// Matched case-insensitively against the document type
    pub pattern: String,
    pub chain: Chain,
}

/// Decides which checkers answer for a citation
#[derive(Clone)]
pub struct ResolutionPolicy {
    routes: Vec<Route>,
    default_chain: Chain,
}

impl fmt::Debug for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |chain: &Chain| chain.iter().map(|c| c.id().to_string()).collect::<Vec<_>>();
        f.debug_struct("ResolutionPolicy")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| (r.pattern.clone(), ids(&r.chain)))
                    .collect::<Vec<_>>(),
            )
            .field("default_chain", &ids(&self.default_chain))
            .finish()
    }
}

impl ResolutionPolicy {
    /// Build a policy from explicit routes; routes are tried in order
    pub fn new(routes: Vec<Route>, default_chain: Chain) -> Result<Self, PolicyError> {
        if default_chain.is_empty() {
            return Err(PolicyError::EmptyChain {
                context: "default chain".to_string(),
            });
        }
        if let Some(route) = routes.iter().find(|r| r.chain.is_empty()) {
            return Err(PolicyError::EmptyChain {
                context: format!("route '{}'", route.pattern),
            });
        }

        Ok(Self {
            routes,
            default_chain,
        })
    }

    /// Resolve checker ids in `config` against `registry`
    pub fn from_config(
        config: &PolicyConfig,
        registry: &CheckerRegistry,
    ) -> Result<Self, PolicyError> {
        let routes = config
            .routes
            .iter()
            .map(|route| -> Result<Route, PolicyError> {
                let context = format!("route '{}'", route.doc_type_contains);
                Ok(Route {
                    pattern: route.doc_type_contains.clone(),
                    chain: lookup_chain(&route.checkers, registry, &context)?,
                })
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;

        let default_chain = lookup_chain(&config.default_chain, registry, "default chain")?;

        Self::new(routes, default_chain)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn default_chain(&self) -> &Chain {
        &self.default_chain
    }

    /// The chain of the first route whose pattern occurs in `doc_type`
    pub fn chain_for(&self, doc_type: &str) -> &Chain {
        self.routes
            .iter()
            .find(|route| mentions(doc_type, &route.pattern))
            .map(|route| &route.chain)
            .unwrap_or(&self.default_chain)
    }

    /// Run the selected chain for a citation
    pub async fn resolve(&self, citation: &Citation) -> Status {
        let chain = self.chain_for(&citation.doc_type);

        for checker in chain {
            let status = checker.check(citation).await;
            tracing::debug!(
                citation = %citation.key(),
                checker = checker.id(),
                status = %status,
                "Checker answered"
            );

            if status != Status::NotFound {
                return status;
            }
        }

        Status::NotFound
    }
}

fn lookup_chain(
    ids: &[String],
    registry: &CheckerRegistry,
    context: &str,
) -> Result<Chain, PolicyError> {
    if ids.is_empty() {
        return Err(PolicyError::EmptyChain {
            context: context.to_string(),
        });
    }

    ids.iter()
        .map(|id| {
            registry
                .get(id)
                .cloned()
                .ok_or_else(|| PolicyError::UnknownChecker {
                    id: id.clone(),
                    context: context.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::sources::MockChecker;

    const DECREE: &str = "Постановление Правительства РФ";

    struct Fixture {
        pravo: Arc<MockChecker>,
        consultant: Arc<MockChecker>,
        policy: ResolutionPolicy,
    }

    fn fixture(pravo_status: Status, consultant_status: Status) -> Fixture {
        let pravo = Arc::new(MockChecker::new("pravo", pravo_status));
        let consultant = Arc::new(MockChecker::new("consultant", consultant_status));

        let mut registry = CheckerRegistry::new();
        registry.register(pravo.clone());
        registry.register(consultant.clone());

        let policy = ResolutionPolicy::from_config(&PolicyConfig::default(), &registry).unwrap();
        Fixture {
            pravo,
            consultant,
            policy,
        }
    }

    #[tokio::test]
    async fn test_decree_falls_back_to_aggregator() {
        let f = fixture(Status::NotFound, Status::Repealed);

        let status = f.policy.resolve(&Citation::new(DECREE, "1479")).await;

        assert_eq!(status, Status::Repealed);
        assert_eq!(f.pravo.calls(), 1);
        assert_eq!(f.consultant.calls(), 1);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_answer() {
        let f = fixture(Status::RequestError, Status::Active);

        let status = f.policy.resolve(&Citation::new(DECREE, "1479")).await;

        assert_eq!(status, Status::RequestError);
        assert_eq!(f.consultant.calls(), 0);
    }

    #[tokio::test]
    async fn test_other_types_use_primary_only() {
        let f = fixture(Status::NotFound, Status::Active);

        let status = f.policy.resolve(&Citation::new("Приказ МЧС", "12")).await;

        assert_eq!(status, Status::NotFound);
        assert_eq!(f.pravo.calls(), 1);
        assert_eq!(f.consultant.calls(), 0);
    }

    #[test]
    fn test_route_matching_ignores_case() {
        let f = fixture(Status::Active, Status::Active);

        assert_eq!(f.policy.chain_for("ПОСТАНОВЛЕНИЕ ПРАВИТЕЛЬСТВА РФ").len(), 2);
        assert_eq!(f.policy.chain_for("Постановление Госстроя").len(), 1);
    }

    #[test]
    fn test_unknown_checker_is_rejected() {
        let registry = CheckerRegistry::new();
        let err = ResolutionPolicy::from_config(&PolicyConfig::default(), &registry).unwrap_err();
        assert!(matches!(err, PolicyError::UnknownChecker { .. }));
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let mut registry = CheckerRegistry::new();
        registry.register(Arc::new(MockChecker::new("pravo", Status::Active)));

        let config = PolicyConfig {
            default_chain: vec!["pravo".to_string()],
            routes: vec![RouteConfig {
                doc_type_contains: "ГОСТ".to_string(),
                checkers: vec![],
            }],
        };

        let err = ResolutionPolicy::from_config(&config, &registry).unwrap_err();
        assert!(matches!(err, PolicyError::EmptyChain { .. }));
    }
}
