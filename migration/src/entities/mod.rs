pub mod choice;
pub mod click;
pub mod lead;

pub use choice::Entity as ChoiceEntity;
pub use click::Entity as ClickEntity;
pub use lead::Entity as LeadEntity;
