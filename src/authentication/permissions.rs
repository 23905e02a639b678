use crate::{
    error::{Error, HtmlError},
    jwt::SessionData,
    schema::{Id, UserRole},
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::CreateReviews,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnReviews,
            ActionType::ManageOwnFavorites,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::CreateReviews,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnReviews,
            ActionType::ManageOwnFavorites,
            ActionType::ManageAllRecipes,
            ActionType::ManageAllReviews,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,
    CreateReviews,

    ManageOwnRecipes,
    ManageOwnReviews,
    ManageOwnFavorites,

    ManageUsers,
    ManageAllRecipes,
    ManageAllReviews,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(r, actions)| {
                if role != r {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

/// Something an actor wants to modify, together with its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Recipe { author_id: Id },
    Review { author_id: Id },
    Favorite { owner_id: Id },
    Users,
}

impl Resource {
    fn owner(&self) -> Option<Id> {
        match self {
            Resource::Recipe { author_id } => Some(*author_id),
            Resource::Review { author_id } => Some(*author_id),
            Resource::Favorite { owner_id } => Some(*owner_id),
            Resource::Users => None,
        }
    }

    fn own_action(&self) -> Option<ActionType> {
        match self {
            Resource::Recipe { .. } => Some(ActionType::ManageOwnRecipes),
            Resource::Review { .. } => Some(ActionType::ManageOwnReviews),
            Resource::Favorite { .. } => Some(ActionType::ManageOwnFavorites),
            Resource::Users => None,
        }
    }

    fn any_action(&self) -> Option<ActionType> {
        match self {
            Resource::Recipe { .. } => Some(ActionType::ManageAllRecipes),
            Resource::Review { .. } => Some(ActionType::ManageAllReviews),
            Resource::Favorite { .. } => None,
            Resource::Users => Some(ActionType::ManageUsers),
        }
    }
}

/// The single capability check. The actor may act on `resource` when
/// their role grants the manage-all action for it, or when they own it and
/// their role grants the manage-own action.
pub fn authorize(actor: &SessionData, resource: Resource) -> Result<(), Error> {
    if resource
        .any_action()
        .is_some_and(|action| action.authenticate(actor))
    {
        return Ok(());
    }

    let owns = resource.owner() == Some(actor.user_id);
    if owns
        && resource
            .own_action()
            .is_some_and(|action| action.authenticate(actor))
    {
        return Ok(());
    }

    Err(HtmlError::Unauthorized.new("Not authorized"))
}
