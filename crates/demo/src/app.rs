use std::sync::Arc;
use std::thread::JoinHandle;

use axum::Router;

use crudkit_api::{ContentAliasMode, PageSerializer, PageSerializerConfig, crud_router};

use crate::people::{self, People};
use crate::users;

/// Page layout shared by every resource: default names, except that the
/// number of elements on the current page is reported as `on_page`.
pub fn page_serializer() -> PageSerializer {
    PageSerializer::new(
        PageSerializerConfig::default()
            .with_content_alias_mode(ContentAliasMode::FirstWord)
            .with_elements_exposed("on_page"),
    )
}

pub struct App {
    pub router: Router,
    /// Background consumer of committed person updates.
    pub person_worker: JoinHandle<usize>,
}

pub fn build_app() -> App {
    let serializer = Arc::new(page_serializer());

    let users = Arc::new(users::controller(serializer.clone()));
    let People { people, cars, worker } = people::controllers(serializer);

    let router = Router::new()
        .nest("/users", crud_router(users))
        .nest("/people", crud_router(Arc::new(people)))
        .nest("/cars", crud_router(Arc::new(cars)));

    App {
        router,
        person_worker: worker,
    }
}

#[cfg(test)]
mod tests {
    use crudkit_core::{Page, PageRequest};

    use super::*;
    use crate::users::UserResponse;

    #[test]
    fn pages_report_on_page_count() {
        let page = Page::new(
            vec![UserResponse {
                id: Some(1),
                name: Some("root".into()),
                created_at: None,
                updated_at: None,
            }],
            &PageRequest::of(0, 10),
            1,
        );
        let json = page_serializer().to_value(&page).unwrap();

        assert_eq!(json["users"][0]["name"], "root");
        assert_eq!(json["elements"]["on_page"], 1);
        assert_eq!(json["elements"]["total"], 1);
    }
}
