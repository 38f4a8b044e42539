pub mod content_repo;
pub mod course_repo;
pub mod module_item_repo;
pub mod module_repo;

pub use content_repo::{ContentCounts, ContentItem, ContentRepository};
pub use course_repo::CourseRepository;
pub use module_item_repo::ModuleItemRepository;
pub use module_repo::ModuleRepository;
