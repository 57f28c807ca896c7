//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod class;
pub mod counter;
pub mod department;
pub mod fee_assessment;
pub mod fee_category;
pub mod fee_line_item;
pub mod fee_structure;
pub mod invoice;
pub mod notification;
pub mod payment;
pub mod payment_method;
pub mod semester;
pub mod student;
pub mod user;

// Re-export specific types to avoid conflicts
pub use class::{Column as ClassColumn, Entity as Class, Model as ClassModel};
pub use counter::{Column as CounterColumn, Entity as Counter, Model as CounterModel};
pub use department::{Column as DepartmentColumn, Entity as Department, Model as DepartmentModel};
pub use fee_assessment::{
    Column as FeeAssessmentColumn, Entity as FeeAssessment, FeeStatus,
    Model as FeeAssessmentModel,
};
pub use fee_category::{
    Column as FeeCategoryColumn, Entity as FeeCategory, Model as FeeCategoryModel,
};
pub use fee_line_item::{
    Column as FeeLineItemColumn, Entity as FeeLineItem, Model as FeeLineItemModel,
};
pub use fee_structure::{
    Column as FeeStructureColumn, Entity as FeeStructure, Model as FeeStructureModel,
};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentStatus};
pub use payment_method::{
    Column as PaymentMethodColumn, Entity as PaymentMethod, Model as PaymentMethodModel,
};
pub use semester::{Column as SemesterColumn, Entity as Semester, Model as SemesterModel};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
