use diesel::{
    deserialize::{FromSql, FromSqlRow},
    expression::AsExpression,
    prelude::*,
    serialize::{Output, ToSql},
    sql_types::Integer,
    sqlite::{Sqlite, SqliteValue},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::schema::{pizzas, restaurant_pizzas, restaurants};

#[derive(Queryable, Selectable, Identifiable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub address: String,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    name: String,
    address: String,
}

impl NewRestaurant {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", name.into())?,
            address: required("address", address.into())?,
        })
    }
}

/// Serialized without its `restaurant_pizzas` so a pizza never expands back
/// into the restaurants that serve it.
#[derive(Queryable, Selectable, Identifiable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = pizzas)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Pizza {
    pub id: i32,
    pub name: String,
    pub ingredients: String,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = pizzas)]
pub struct NewPizza {
    name: String,
    ingredients: String,
}

impl NewPizza {
    pub fn new(
        name: impl Into<String>,
        ingredients: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", name.into())?,
            ingredients: required("ingredients", ingredients.into())?,
        })
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(value)
}

/// Price of a pizza at one restaurant. Only constructible through
/// [`Price::new`], so every stored or assigned price is within range.
#[derive(FromSqlRow, AsExpression, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Integer)]
pub struct Price(i32);

impl Price {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 30;

    /// Accepts any integer the caller was handed; values outside `i32`
    /// fail the same range check as any other out-of-range price.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match i32::try_from(value) {
            Ok(price) if (Self::MIN..=Self::MAX).contains(&price) => Ok(Self(price)),
            _ => Err(ValidationError::PriceOutOfRange(value)),
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl ToSql<Integer, Sqlite> for Price {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> diesel::serialize::Result {
        <i32 as ToSql<Integer, Sqlite>>::to_sql(&self.0, out)
    }
}

impl FromSql<Integer, Sqlite> for Price {
    fn from_sql(bytes: SqliteValue<'_, '_, '_>) -> diesel::deserialize::Result<Self> {
        let value = <i32 as FromSql<Integer, Sqlite>>::from_sql(bytes)?;
        Ok(Price::new(value.into())?)
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(belongs_to(Pizza))]
#[diesel(table_name = restaurant_pizzas)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RestaurantPizza {
    pub id: i32,
    price: Price,
    pub pizza_id: i32,
    pub restaurant_id: i32,
}

impl RestaurantPizza {
    pub fn price(&self) -> Price {
        self.price
    }

    pub fn set_price(&mut self, price: i64) -> Result<(), ValidationError> {
        self.price = Price::new(price)?;
        Ok(())
    }
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurant_pizzas)]
pub struct NewRestaurantPizza {
    price: Price,
    pub pizza_id: i32,
    pub restaurant_id: i32,
}

impl NewRestaurantPizza {
    pub fn new(price: i64, pizza_id: i32, restaurant_id: i32) -> Result<Self, ValidationError> {
        Ok(Self {
            price: Price::new(price)?,
            pizza_id,
            restaurant_id,
        })
    }
}

/// Wire shape of a restaurant-pizza association: the pizza is embedded, the
/// owning restaurant is referenced by id only.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RestaurantPizzaDetails {
    pub id: i32,
    pub price: i32,
    pub pizza_id: i32,
    pub restaurant_id: i32,
    pub pizza: Pizza,
}

impl RestaurantPizzaDetails {
    pub fn new(restaurant_pizza: RestaurantPizza, pizza: Pizza) -> Self {
        Self {
            id: restaurant_pizza.id,
            price: restaurant_pizza.price.get(),
            pizza_id: restaurant_pizza.pizza_id,
            restaurant_id: restaurant_pizza.restaurant_id,
            pizza,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RestaurantDetails {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub restaurant_pizzas: Vec<RestaurantPizzaDetails>,
}

impl RestaurantDetails {
    pub fn new(restaurant: Restaurant, restaurant_pizzas: Vec<(RestaurantPizza, Pizza)>) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name,
            address: restaurant.address,
            restaurant_pizzas: restaurant_pizzas
                .into_iter()
                .map(|(rp, pizza)| RestaurantPizzaDetails::new(rp, pizza))
                .collect(),
        }
    }

    /// Pizzas served by this restaurant, in association order.
    pub fn pizzas(&self) -> impl Iterator<Item = &Pizza> {
        self.restaurant_pizzas.iter().map(|rp| &rp.pizza)
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RestaurantSummary {
    pub id: i32,
    pub name: String,
    pub address: String,
}

impl From<Restaurant> for RestaurantSummary {
    fn from(r: Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name,
            address: r.address,
        }
    }
}
