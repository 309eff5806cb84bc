pub mod m202607010001_create_courses;
pub mod m202607010002_create_enrollments;
pub mod m202607050001_create_attendance;
pub mod m202607120001_create_profiles;
