use diesel::{dsl::exists, prelude::*, select, SqliteConnection};
use tracing::debug;

use crate::error::RepositoryError;
use crate::models::{
    NewPizza, NewRestaurant, NewRestaurantPizza, Pizza, Restaurant, RestaurantDetails,
    RestaurantPizza, RestaurantPizzaDetails, RestaurantSummary,
};
use crate::schema::{pizzas, restaurant_pizzas, restaurants};

/// Data access for restaurants, pizzas and the prices that link them.
///
/// Every operation runs in its own transaction on the borrowed connection.
/// Writes take SQLite's write lock up front (`BEGIN IMMEDIATE`), so
/// concurrent writers queue on `busy_timeout` instead of failing when a
/// read lock cannot be upgraded.
pub struct RestaurantRepository<'a> {
    conn: &'a mut SqliteConnection,
    in_unit_of_work: bool,
}

impl<'a> RestaurantRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self {
            conn,
            in_unit_of_work: false,
        }
    }

    /// Runs `f` inside a single immediate transaction. Operations called on
    /// the repository handed to `f` become savepoints of it, and nothing is
    /// kept unless `f` returns `Ok`.
    pub fn atomically<T, F>(&mut self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut RestaurantRepository<'_>) -> Result<T, RepositoryError>,
    {
        if self.in_unit_of_work {
            return f(self);
        }
        self.conn.immediate_transaction(|conn| {
            f(&mut RestaurantRepository {
                conn,
                in_unit_of_work: true,
            })
        })
    }

    fn write<T, F>(&mut self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, RepositoryError>,
    {
        if self.in_unit_of_work {
            self.conn.transaction(f)
        } else {
            self.conn.immediate_transaction(f)
        }
    }

    pub fn list_restaurants(&mut self) -> Result<Vec<RestaurantDetails>, RepositoryError> {
        self.conn.transaction(|conn| {
            let results = restaurants::table
                .select(Restaurant::as_select())
                .order(restaurants::id.asc())
                .load(conn)?;

            let listings = RestaurantPizza::belonging_to(&results)
                .inner_join(pizzas::table)
                .select((RestaurantPizza::as_select(), Pizza::as_select()))
                .order(restaurant_pizzas::id.asc())
                .load::<(RestaurantPizza, Pizza)>(conn)?
                .grouped_by(&results);

            Ok(results
                .into_iter()
                .zip(listings)
                .map(|(r, rps)| RestaurantDetails::new(r, rps))
                .collect())
        })
    }

    pub fn get_restaurant(&mut self, id: i32) -> Result<RestaurantDetails, RepositoryError> {
        self.conn.transaction(|conn| {
            let restaurant = find_restaurant(conn, id)?;
            let listings = RestaurantPizza::belonging_to(&restaurant)
                .inner_join(pizzas::table)
                .select((RestaurantPizza::as_select(), Pizza::as_select()))
                .order(restaurant_pizzas::id.asc())
                .load::<(RestaurantPizza, Pizza)>(conn)?;

            Ok(RestaurantDetails::new(restaurant, listings))
        })
    }

    pub fn create_restaurant(
        &mut self,
        restaurant: NewRestaurant,
    ) -> Result<Restaurant, RepositoryError> {
        self.write(|conn| {
            let created = diesel::insert_into(restaurants::table)
                .values(&restaurant)
                .returning(Restaurant::as_returning())
                .get_result(conn)?;
            debug!(id = created.id, "restaurant created");
            Ok(created)
        })
    }

    /// Removes the restaurant together with every price it offers.
    pub fn delete_restaurant(&mut self, id: i32) -> Result<(), RepositoryError> {
        self.write(|conn| {
            let restaurant = find_restaurant(conn, id)?;
            let removed = diesel::delete(RestaurantPizza::belonging_to(&restaurant)).execute(conn)?;
            diesel::delete(restaurants::table.find(restaurant.id)).execute(conn)?;
            debug!(id, removed, "restaurant deleted");
            Ok(())
        })
    }

    pub fn list_pizzas(&mut self) -> Result<Vec<Pizza>, RepositoryError> {
        self.conn.transaction(|conn| {
            Ok(pizzas::table
                .select(Pizza::as_select())
                .order(pizzas::id.asc())
                .load(conn)?)
        })
    }

    pub fn create_pizza(&mut self, pizza: NewPizza) -> Result<Pizza, RepositoryError> {
        self.write(|conn| {
            let created = diesel::insert_into(pizzas::table)
                .values(&pizza)
                .returning(Pizza::as_returning())
                .get_result(conn)?;
            debug!(id = created.id, "pizza created");
            Ok(created)
        })
    }

    /// Removes the pizza from the catalogue and from every restaurant menu.
    pub fn delete_pizza(&mut self, id: i32) -> Result<(), RepositoryError> {
        self.write(|conn| {
            let pizza = find_pizza(conn, id)?;
            let removed = diesel::delete(RestaurantPizza::belonging_to(&pizza)).execute(conn)?;
            diesel::delete(pizzas::table.find(pizza.id)).execute(conn)?;
            debug!(id, removed, "pizza deleted");
            Ok(())
        })
    }

    /// Restaurants serving the given pizza, one entry per price listing.
    pub fn pizza_restaurants(
        &mut self,
        pizza_id: i32,
    ) -> Result<Vec<RestaurantSummary>, RepositoryError> {
        self.conn.transaction(|conn| {
            let pizza = find_pizza(conn, pizza_id)?;
            let results = RestaurantPizza::belonging_to(&pizza)
                .inner_join(restaurants::table)
                .select(Restaurant::as_select())
                .order(restaurant_pizzas::id.asc())
                .load(conn)?;
            Ok(results.into_iter().map(RestaurantSummary::from).collect())
        })
    }

    /// Lists `price` for a pizza at a restaurant.
    ///
    /// All problems with the request are reported together; nothing is
    /// written unless the price and both references are valid.
    pub fn create_restaurant_pizza(
        &mut self,
        price: i64,
        pizza_id: i32,
        restaurant_id: i32,
    ) -> Result<RestaurantPizzaDetails, RepositoryError> {
        self.write(|conn| {
            let mut errors = Vec::new();

            let new_restaurant_pizza = NewRestaurantPizza::new(price, pizza_id, restaurant_id)
                .map_err(|e| errors.push(e.to_string()))
                .ok();

            let pizza = pizzas::table
                .find(pizza_id)
                .select(Pizza::as_select())
                .first(conn)
                .optional()?;
            if pizza.is_none() {
                errors.push(format!("Pizza {pizza_id} does not exist"));
            }

            let restaurant_exists =
                select(exists(restaurants::table.find(restaurant_id))).get_result::<bool>(conn)?;
            if !restaurant_exists {
                errors.push(format!("Restaurant {restaurant_id} does not exist"));
            }

            let (Some(new_restaurant_pizza), Some(pizza), true) =
                (new_restaurant_pizza, pizza, errors.is_empty())
            else {
                return Err(RepositoryError::Validation(errors));
            };

            let created = diesel::insert_into(restaurant_pizzas::table)
                .values(&new_restaurant_pizza)
                .returning(RestaurantPizza::as_returning())
                .get_result(conn)?;
            debug!(id = created.id, pizza_id, restaurant_id, "restaurant pizza created");

            Ok(RestaurantPizzaDetails::new(created, pizza))
        })
    }

    pub fn update_price(
        &mut self,
        id: i32,
        price: i64,
    ) -> Result<RestaurantPizza, RepositoryError> {
        self.write(|conn| {
            let mut restaurant_pizza = restaurant_pizzas::table
                .find(id)
                .select(RestaurantPizza::as_select())
                .first(conn)
                .optional()?
                .ok_or(RepositoryError::NotFound {
                    entity: "RestaurantPizza",
                    id,
                })?;
            restaurant_pizza.set_price(price)?;

            diesel::update(restaurant_pizzas::table.find(id))
                .set(restaurant_pizzas::price.eq(restaurant_pizza.price()))
                .execute(conn)?;
            Ok(restaurant_pizza)
        })
    }

    /// Empties all tables, children first.
    pub fn reset(&mut self) -> Result<(), RepositoryError> {
        self.write(|conn| {
            diesel::delete(restaurant_pizzas::table).execute(conn)?;
            diesel::delete(pizzas::table).execute(conn)?;
            diesel::delete(restaurants::table).execute(conn)?;
            Ok(())
        })
    }
}

fn find_restaurant(conn: &mut SqliteConnection, id: i32) -> Result<Restaurant, RepositoryError> {
    restaurants::table
        .find(id)
        .select(Restaurant::as_select())
        .first(conn)
        .optional()?
        .ok_or(RepositoryError::NotFound {
            entity: "Restaurant",
            id,
        })
}

fn find_pizza(conn: &mut SqliteConnection, id: i32) -> Result<Pizza, RepositoryError> {
    pizzas::table
        .find(id)
        .select(Pizza::as_select())
        .first(conn)
        .optional()?
        .ok_or(RepositoryError::NotFound { entity: "Pizza", id })
}
