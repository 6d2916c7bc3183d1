pub mod grade;
pub mod profile;
pub mod qualitative;
pub mod scorer;
