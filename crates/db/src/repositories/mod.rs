//! Repository layer: one zero-sized struct per table family, each exposing
//! async functions that take `&PgPool`.

pub mod access_log_repo;
pub mod attendance_repo;
pub mod business_repo;
pub mod cart_repo;
pub mod class_repo;
pub mod message_repo;
pub mod order_repo;
pub mod payment_repo;
pub mod plan_repo;
pub mod product_repo;
pub mod schedule_repo;
pub mod score_repo;
pub mod session_repo;
pub mod subscription_repo;
pub mod survey_repo;
pub mod telegram_repo;
pub mod user_repo;

pub use access_log_repo::AccessLogRepo;
pub use attendance_repo::AttendanceRepo;
pub use business_repo::BusinessRepo;
pub use cart_repo::CartRepo;
pub use class_repo::ClassRepo;
pub use message_repo::MessageRepo;
pub use order_repo::OrderRepo;
pub use payment_repo::PaymentRepo;
pub use plan_repo::PlanRepo;
pub use product_repo::ProductRepo;
pub use schedule_repo::ScheduleRepo;
pub use score_repo::ScoreRepo;
pub use session_repo::SessionRepo;
pub use subscription_repo::SubscriptionRepo;
pub use survey_repo::SurveyRepo;
pub use telegram_repo::TelegramRepo;
pub use user_repo::UserRepo;
