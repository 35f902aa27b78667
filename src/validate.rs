// Field validators for the signup form. All of these are total over their
// input: they return a bool and never panic. The caller decides how a
// failure is reported.

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const SCHOOL_MAX: usize = 200;
pub const SOURCE_MAX: usize = 100;

pub fn valid_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (1..=NAME_MAX).contains(&len)
}

// Shape check only: exactly one '@', non-empty local part, a '.' somewhere
// after it, and no whitespace. Deliverability is not our problem.
pub fn valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    // domain needs a dot with something on both sides
    let mut labels = domain.split('.');
    labels.clone().count() >= 2 && labels.all(|l| !l.is_empty())
}

pub fn valid_school(school: Option<&str>) -> bool {
    match school {
        None => true,
        Some(s) => s.trim().chars().count() <= SCHOOL_MAX,
    }
}

pub fn valid_source(source: Option<&str>) -> bool {
    match source {
        None => true,
        Some(s) => s.trim().chars().count() <= SOURCE_MAX,
    }
}
