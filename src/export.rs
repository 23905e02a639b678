//! Plain text rendering of a recipe, served as a download.
//!
//! ```text
//! Peanut Butter Bites
//!
//!
//! INGREDIENTS:
//! • oats
//! • peanut butter
//!
//!
//! DIRECTIONS:
//! 1. Mix
//! 2. Chill
//!
//!
//! CALORIES: 180
//! ```

use std::fmt;

use crate::schema::Recipe;

#[derive(Debug, Clone)]
pub struct RecipeText<'a> {
    recipe: &'a Recipe,
}

impl<'a> RecipeText<'a> {
    pub fn new(recipe: &'a Recipe) -> Self {
        Self { recipe }
    }

    /// File name offered in the `Content-Disposition` header. Quotes and
    /// path separators are replaced so the header stays well formed.
    pub fn filename(&self) -> String {
        let title: String = self
            .recipe
            .title
            .chars()
            .map(|c| match c {
                '"' | '/' | '\\' | '\r' | '\n' => '_',
                c => c,
            })
            .collect();

        format!("{title}.txt")
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename())
    }
}

impl fmt::Display for RecipeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipe = self.recipe;
        let mut lines: Vec<String> = vec![recipe.title.to_owned(), String::from("\n\nINGREDIENTS:")];
        lines.extend(recipe.ingredients.iter().map(|i| format!("• {i}")));
        lines.push(String::from("\n\nDIRECTIONS:"));
        lines.extend(
            recipe
                .directions
                .iter()
                .enumerate()
                .map(|(n, d)| format!("{}. {d}", n + 1)),
        );

        let calories = recipe.nutritional_info.calories;
        if calories > 0. {
            lines.push(format!("\n\nCALORIES: {calories}"));
        } else {
            lines.push(String::from("\n\nCALORIES: N/A"));
        }

        write!(f, "{}", lines.join("\n"))
    }
}
