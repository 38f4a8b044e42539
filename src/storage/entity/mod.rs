pub mod course;
pub mod course_lesson;
pub mod course_module;
pub mod hands_on_lab;
pub mod interactive_learning_unit;
pub mod module_item;
pub mod quiz;
pub mod quiz_question;

pub use course::Entity as Course;
pub use course_lesson::Entity as CourseLesson;
pub use course_module::Entity as CourseModule;
pub use hands_on_lab::Entity as HandsOnLab;
pub use interactive_learning_unit::Entity as InteractiveLearningUnit;
pub use module_item::Entity as ModuleItem;
pub use quiz::Entity as Quiz;
pub use quiz_question::Entity as QuizQuestion;
