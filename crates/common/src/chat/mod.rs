//! Chat pipeline
//!
//! classify → assemble → render → dispatch → log, for one authenticated query.

use crate::auth::Session;
use crate::context::{ContextAssembler, PromptCompiler, QueryClassifier, ResponseGateway};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 2000;

/// Answer given when a student session points at a deleted record
pub const STUDENT_NOT_FOUND_RESPONSE: &str = "Sorry, I couldn't find your student record.";

#[derive(Clone)]
pub struct ChatService {
    repo: Repository,
    classifier: Arc<QueryClassifier>,
    assembler: ContextAssembler,
    compiler: PromptCompiler,
    gateway: ResponseGateway,
}

impl ChatService {
    pub fn new(
        repo: Repository,
        assembler: ContextAssembler,
        compiler: PromptCompiler,
        gateway: ResponseGateway,
    ) -> Self {
        Self {
            repo,
            classifier: Arc::new(QueryClassifier::new()),
            assembler,
            compiler,
            gateway,
        }
    }

    pub fn gateway(&self) -> &ResponseGateway {
        &self.gateway
    }

    /// Answer a query and append it to the chat log
    #[instrument(skip(self, session, query), fields(role = session.role.as_str(), user_id = session.user_id))]
    pub async fn answer(&self, session: &Session, query: &str) -> Result<String> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("query", "Empty query"));
        }
        if trimmed.chars().count() > MAX_QUERY_CHARS {
            return Err(AppError::validation(
                "query",
                format!("Query must be at most {} characters", MAX_QUERY_CHARS),
            ));
        }

        let keywords = self.classifier.classify(trimmed);
        debug!(keywords = ?keywords.iter().collect::<Vec<_>>(), "Query classified");

        let (response, outcome) = match self.assembler.assemble(session, trimmed, keywords).await {
            Ok(context) => {
                let prompt = self.compiler.render_prompt(&context);
                let response = self.gateway.dispatch(&prompt).await;
                (response, "answered")
            }
            Err(AppError::RecordNotFound { .. }) => {
                (STUDENT_NOT_FOUND_RESPONSE.to_string(), "record_not_found")
            }
            Err(e) => return Err(e),
        };

        self.repo
            .create_chat_log(session.role.as_str(), session.user_id, query, &response)
            .await?;

        crate::metrics::record_chat(session.role.as_str(), outcome);
        info!(outcome, response_len = response.len(), "Chat query answered");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, Role};
    use crate::context::{LanguageModel, ModelHandle, FALLBACK_RESPONSE};
    use crate::db::models::StudentPatch;
    use crate::db::DbPool;
    use async_trait::async_trait;

    /// Returns the prompt so tests can see what was assembled
    struct PromptEcho;

    #[async_trait]
    impl LanguageModel for PromptEcho {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }

        fn model_name(&self) -> &str {
            "prompt-echo"
        }
    }

    async fn service(handle: ModelHandle) -> (ChatService, Repository) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let assembler = ContextAssembler::new(repo.clone(), "does/not/exist.txt");
        let chat = ChatService::new(
            repo.clone(),
            assembler,
            PromptCompiler::new("Test College"),
            ResponseGateway::new(handle),
        );
        (chat, repo)
    }

    async fn student_session(repo: &Repository) -> Session {
        repo.upsert_students(&[StudentPatch::new(101, "R1", "Asha")])
            .await
            .unwrap();
        let student = repo
            .find_student_by_natural_key(101, "R1")
            .await
            .unwrap()
            .unwrap();
        Session::student(&student)
    }

    fn admin_session() -> Session {
        Session {
            role: Role::Admin,
            user_id: 1,
            identity: Identity::Admin {
                email: "admin@example.com".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_student_policy_query() {
        let (chat, repo) = service(ModelHandle::Ready(Arc::new(PromptEcho))).await;
        let session = student_session(&repo).await;

        let response = chat
            .answer(&session, "What is my attendance policy?")
            .await
            .unwrap();
        assert!(response.contains("Name: Asha"));
        assert!(response.contains("Academic honesty"));

        let logs = repo.list_chat_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_type, "student");
        assert_eq!(logs[0].user_id, session.user_id);
        assert_eq!(logs[0].response, response);
    }

    #[tokio::test]
    async fn test_unreachable_model_logs_fallback() {
        let (chat, repo) = service(ModelHandle::Unavailable {
            reason: "no key".into(),
        })
        .await;

        let response = chat.answer(&admin_session(), "list students").await.unwrap();
        assert_eq!(response, FALLBACK_RESPONSE);

        let logs = repo.list_chat_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user_type, "admin");
        assert_eq!(logs[0].response, FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_deleted_student_gets_apology() {
        let (chat, repo) = service(ModelHandle::Ready(Arc::new(PromptEcho))).await;
        let session = student_session(&repo).await;
        repo.delete_student(session.user_id).await.unwrap();

        let response = chat.answer(&session, "What is my GPA?").await.unwrap();
        assert_eq!(response, STUDENT_NOT_FOUND_RESPONSE);
        assert_eq!(repo.list_chat_logs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let (chat, repo) = service(ModelHandle::Ready(Arc::new(PromptEcho))).await;

        let err = chat.answer(&admin_session(), "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let long = "a".repeat(MAX_QUERY_CHARS + 1);
        let err = chat.answer(&admin_session(), &long).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        assert!(repo.list_chat_logs().await.unwrap().is_empty());
    }
}
