//! SeaORM entity models
//!
//! Database entities for CampusDesk

mod account;
mod chat_log;
mod session;
mod student;
mod uploaded_file;

pub use account::{
    Entity as AccountEntity,
    Model as Account,
    ActiveModel as AccountActiveModel,
    Column as AccountColumn,
};

pub use student::{
    display_opt,
    StudentPatch,
    Entity as StudentEntity,
    Model as Student,
    ActiveModel as StudentActiveModel,
    Column as StudentColumn,
};

pub use uploaded_file::{
    Entity as UploadedFileEntity,
    Model as UploadedFile,
    ActiveModel as UploadedFileActiveModel,
    Column as UploadedFileColumn,
    FileKind,
};

pub use chat_log::{
    Entity as ChatLogEntity,
    Model as ChatLog,
    ActiveModel as ChatLogActiveModel,
    Column as ChatLogColumn,
};

pub use session::{
    Entity as SessionEntity,
    Model as SessionRecord,
    ActiveModel as SessionActiveModel,
    Column as SessionColumn,
};
