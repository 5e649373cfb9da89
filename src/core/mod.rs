//! Practice engine: scheduling, the provider cascade, grading and analytics.

pub mod analytics;
pub mod cascade;
pub mod generation;
pub mod grading;
pub mod health;
pub mod http;
pub mod interval;
pub mod json_mode;
pub mod leitner;
pub mod logging;
pub mod models;
pub mod provider;
pub mod scheduler;

pub use analytics::{MonthlyTrend, RetentionSegment, RetentionStats, StatsReport};
pub use cascade::{Cascade, CascadeAttempt, CascadeRequest, CascadeResponse, JsonResponse};
pub use generation::{GeneratedQuestion, PracticeQuestion, QuestionGenerator};
pub use grading::{AttemptInput, GradeOutcome, GradeRequest, GradeVerdict, GradingPipeline, Submission};
pub use health::{CASCADE_HEALTH_KEY, HealthWarning, ProviderHealth, WarningKind};
pub use leitner::FailurePolicy;
pub use models::{AttemptRecord, AttemptResult, ErrorKind, SkillProgress};
pub use provider::{AiConfig, CustomProviderEntry, ProviderDescriptor, ProviderKind, RoutingEntry};
pub use scheduler::{QueueStatus, ScheduledItem, Scheduler};
