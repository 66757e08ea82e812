//! Sample rows served by listing endpoints while the store is unreachable,
//! so the admin UI keeps rendering during an outage.

use chrono::{DateTime, Duration, Utc};
use residency_core::{
    Course, CourseStatus, MentorApplication, MentorApplicationStatus, PageRequest, Paginated,
    Role, User,
};
use uuid::Uuid;

fn day(n: i64) -> DateTime<Utc> {
    // 2024-01-01
    DateTime::<Utc>::default() + Duration::days(19_723 + n)
}

fn paginate<T: Clone>(rows: Vec<T>, page: PageRequest) -> Paginated<T> {
    let total = rows.len() as u64;
    let mut result = Paginated::new(page.slice(&rows), page, total);
    result.page.fallback = true;
    result
}

pub fn courses(page: PageRequest) -> Paginated<Course> {
    let rows = [
        (1, "Founder Foundations", "Validate the problem before building.", CourseStatus::Published),
        (2, "Fundraising 101", "From first check to priced round.", CourseStatus::Published),
        (3, "Go-To-Market Sprint", "Find the first ten customers.", CourseStatus::Draft),
    ]
    .into_iter()
    .map(|(n, title, description, status)| Course {
        id: Uuid::from_u128(0x1000 + n),
        title: title.to_string(),
        slug: residency_core::slugify(title),
        description: description.to_string(),
        status,
        position: n as i32,
        created_at: day(n as i64),
        updated_at: day(n as i64),
    })
    .collect();
    paginate(rows, page)
}

pub fn users(page: PageRequest) -> Paginated<User> {
    let rows = [
        (1, "ada@example.com", "Ada Admin", Role::Admin, 0),
        (2, "grace@example.com", "Grace Mentor", Role::Mentor, 120),
        (3, "linus@example.com", "Linus Learner", Role::User, 40),
    ]
    .into_iter()
    .map(|(n, email, name, role, credits)| User {
        id: Uuid::from_u128(0x2000 + n),
        firebase_uid: format!("sample-uid-{n}"),
        email: email.to_string(),
        display_name: name.to_string(),
        role,
        credits,
        bio: None,
        created_at: day(n as i64),
        updated_at: day(n as i64),
    })
    .collect();
    paginate(rows, page)
}

pub fn mentor_applications(page: PageRequest) -> Paginated<MentorApplication> {
    let rows = [
        (1, "Margaret Operator", "margaret@example.com", "operations", MentorApplicationStatus::Pending),
        (2, "Alan Engineer", "alan@example.com", "engineering", MentorApplicationStatus::Approved),
    ]
    .into_iter()
    .map(|(n, name, email, expertise, status)| MentorApplication {
        id: Uuid::from_u128(0x3000 + n),
        user_id: None,
        full_name: name.to_string(),
        email: email.to_string(),
        linkedin_url: None,
        expertise: vec![expertise.to_string()],
        motivation: "Help early founders avoid the mistakes I made.".to_string(),
        years_experience: 10,
        status,
        reviewed_by: None,
        reviewed_at: None,
        review_note: None,
        created_at: day(n as i64),
        updated_at: day(n as i64),
    })
    .collect();
    paginate(rows, page)
}
