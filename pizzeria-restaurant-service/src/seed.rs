use tracing::info;

use crate::error::RepositoryError;
use crate::models::{NewPizza, NewRestaurant};
use crate::repository::RestaurantRepository;

const RESTAURANTS: &[(&str, &str)] = &[
    ("Karen's Pizza Shack", "address1"),
    ("Sanjay's Pizza", "address2"),
    ("Kiki's Pizza", "address3"),
];

const PIZZAS: &[(&str, &str)] = &[
    ("Emma", "Dough, Tomato Sauce, Cheese"),
    ("Geri", "Dough, Tomato Sauce, Cheese, Pepperoni"),
    ("Melanie", "Dough, Sauce, Ricotta, Red peppers, Mustard"),
];

/// (price, pizza index, restaurant index)
const PRICES: &[(i64, usize, usize)] = &[(1, 0, 0), (4, 1, 1), (5, 2, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub restaurants: usize,
    pub pizzas: usize,
    pub restaurant_pizzas: usize,
}

/// Replaces the store contents with a small demo data set. Either the whole
/// set is loaded or the previous contents are left untouched.
pub fn seed(repo: &mut RestaurantRepository<'_>) -> Result<SeedSummary, RepositoryError> {
    let summary = repo.atomically(|repo| replace_contents(repo, RESTAURANTS, PIZZAS, PRICES))?;
    info!(?summary, "seeded database");
    Ok(summary)
}

fn replace_contents(
    repo: &mut RestaurantRepository<'_>,
    restaurants: &[(&str, &str)],
    pizzas: &[(&str, &str)],
    prices: &[(i64, usize, usize)],
) -> Result<SeedSummary, RepositoryError> {
    repo.reset()?;

    let restaurants = restaurants
        .iter()
        .map(|(name, address)| repo.create_restaurant(NewRestaurant::new(*name, *address)?))
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let pizzas = pizzas
        .iter()
        .map(|(name, ingredients)| repo.create_pizza(NewPizza::new(*name, *ingredients)?))
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    for &(price, pizza, restaurant) in prices {
        repo.create_restaurant_pizza(price, pizzas[pizza].id, restaurants[restaurant].id)?;
    }

    Ok(SeedSummary {
        restaurants: restaurants.len(),
        pizzas: pizzas.len(),
        restaurant_pizzas: prices.len(),
    })
}
